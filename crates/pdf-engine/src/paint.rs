//! Vector painter for page content streams.
//!
//! Interprets the path construction and painting operators plus the
//! graphics state stack, filling and stroking onto an RGBA surface. Text,
//! images, shadings and clipping paths are skipped.

use crate::RgbaImage;
use image::Rgba;
use lopdf::content::{Content, Operation};
use tracing::trace;

const CURVE_STEPS: usize = 16;
const MIN_STROKE_PX: f32 = 1.0;

/// Affine transform in PDF order: `[a b c d e f]` maps `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    /// Page space to pixel space: scales, drops the media box origin and
    /// flips the y axis so row 0 is the top edge.
    pub(crate) fn page_to_device(origin: (f32, f32), top: f32, scale: f32) -> Self {
        Matrix { a: scale, b: 0.0, c: 0.0, d: -scale, e: -origin.0 * scale, f: top * scale }
    }

    fn from_operands(v: &[f32]) -> Self {
        Matrix { a: v[0], b: v[1], c: v[2], d: v[3], e: v[4], f: v[5] }
    }

    /// `self` first, then `next`.
    fn then(self, next: Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> Point {
        Point { x: self.a * x + self.c * y + self.e, y: self.b * x + self.d * y + self.f }
    }

    fn expansion(&self) -> f32 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
    line_width: f32,
}

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Default)]
struct Path {
    subpaths: Vec<Subpath>,
}

#[derive(Debug, Default)]
struct Subpath {
    points: Vec<Point>,
    closed: bool,
}

impl Path {
    fn move_to(&mut self, point: Point) {
        self.subpaths.push(Subpath { points: vec![point], closed: false });
    }

    fn line_to(&mut self, point: Point) {
        match self.subpaths.last_mut() {
            Some(subpath) if !subpath.closed => subpath.points.push(point),
            Some(subpath) => {
                let start = subpath.points[0];
                self.subpaths.push(Subpath { points: vec![start, point], closed: false });
            }
            None => self.move_to(point),
        }
    }

    fn current(&self) -> Option<Point> {
        self.subpaths.last().and_then(|subpath| subpath.points.last().copied())
    }

    fn curve_to(&mut self, c1: Point, c2: Point, end: Point) {
        let Some(start) = self.current() else {
            self.move_to(end);
            return;
        };

        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.line_to(Point {
                x: w0 * start.x + w1 * c1.x + w2 * c2.x + w3 * end.x,
                y: w0 * start.y + w1 * c1.y + w2 * c2.y + w3 * end.y,
            });
        }
    }

    fn close(&mut self) {
        if let Some(subpath) = self.subpaths.last_mut() {
            subpath.closed = true;
        }
    }

    fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }
}

/// Paint the decoded operators of one content stream onto `image`.
pub(crate) fn paint_content(
    image: &mut RgbaImage,
    content: &[u8],
    base: Matrix,
) -> Result<(), lopdf::Error> {
    let content = Content::decode(content)?;
    let mut painter = Painter::new(image, base);

    for operation in &content.operations {
        painter.apply(operation);
    }

    Ok(())
}

struct Painter<'a> {
    image: &'a mut RgbaImage,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    path: Path,
}

impl<'a> Painter<'a> {
    fn new(image: &'a mut RgbaImage, base: Matrix) -> Self {
        Self {
            image,
            state: GraphicsState { ctm: base, fill: BLACK, stroke: BLACK, line_width: 1.0 },
            saved: Vec::new(),
            path: Path::default(),
        }
    }

    fn apply(&mut self, operation: &Operation) {
        // Name or string operands: colour spaces, patterns, text, XObjects.
        let Some(v) = numbers(operation) else {
            trace!(operator = %operation.operator, "skipping non-numeric operator");
            return;
        };

        let ctm = self.state.ctm;
        match (operation.operator.as_str(), v.len()) {
            ("q", _) => self.saved.push(self.state),
            ("Q", _) => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            ("cm", 6) => self.state.ctm = Matrix::from_operands(&v).then(ctm),
            ("w", 1) => self.state.line_width = v[0],

            ("g", 1) => self.state.fill = gray(v[0]),
            ("G", 1) => self.state.stroke = gray(v[0]),
            ("rg", 3) => self.state.fill = rgb(v[0], v[1], v[2]),
            ("RG", 3) => self.state.stroke = rgb(v[0], v[1], v[2]),
            ("k", 4) => self.state.fill = cmyk(v[0], v[1], v[2], v[3]),
            ("K", 4) => self.state.stroke = cmyk(v[0], v[1], v[2], v[3]),
            ("sc" | "scn", n) => {
                if let Some(color) = by_components(&v, n) {
                    self.state.fill = color;
                }
            }
            ("SC" | "SCN", n) => {
                if let Some(color) = by_components(&v, n) {
                    self.state.stroke = color;
                }
            }

            ("m", 2) => self.path.move_to(ctm.apply(v[0], v[1])),
            ("l", 2) => self.path.line_to(ctm.apply(v[0], v[1])),
            ("c", 6) => self.path.curve_to(
                ctm.apply(v[0], v[1]),
                ctm.apply(v[2], v[3]),
                ctm.apply(v[4], v[5]),
            ),
            ("v", 4) => {
                if let Some(current) = self.path.current() {
                    self.path.curve_to(current, ctm.apply(v[0], v[1]), ctm.apply(v[2], v[3]));
                }
            }
            ("y", 4) => {
                let end = ctm.apply(v[2], v[3]);
                self.path.curve_to(ctm.apply(v[0], v[1]), end, end);
            }
            ("h", _) => self.path.close(),
            ("re", 4) => {
                let (x, y, w, h) = (v[0], v[1], v[2], v[3]);
                self.path.move_to(ctm.apply(x, y));
                self.path.line_to(ctm.apply(x + w, y));
                self.path.line_to(ctm.apply(x + w, y + h));
                self.path.line_to(ctm.apply(x, y + h));
                self.path.close();
            }

            ("f" | "F", _) => self.finish(Some(FillRule::NonZero), false),
            ("f*", _) => self.finish(Some(FillRule::EvenOdd), false),
            ("S", _) => self.finish(None, true),
            ("s", _) => {
                self.path.close();
                self.finish(None, true);
            }
            ("B", _) => self.finish(Some(FillRule::NonZero), true),
            ("B*", _) => self.finish(Some(FillRule::EvenOdd), true),
            ("b", _) => {
                self.path.close();
                self.finish(Some(FillRule::NonZero), true);
            }
            ("b*", _) => {
                self.path.close();
                self.finish(Some(FillRule::EvenOdd), true);
            }
            ("n", _) => self.path = Path::default(),

            (operator, _) => trace!(operator, "skipping unsupported operator"),
        }
    }

    fn finish(&mut self, fill: Option<FillRule>, stroke: bool) {
        let path = std::mem::take(&mut self.path);
        if path.is_empty() {
            return;
        }

        if let Some(rule) = fill {
            let polygons: Vec<Vec<Point>> =
                path.subpaths.iter().map(|subpath| subpath.points.clone()).collect();
            fill_polygons(self.image, &polygons, rule, self.state.fill);
        }

        if stroke {
            let width =
                (self.state.line_width * self.state.ctm.expansion()).max(MIN_STROKE_PX);
            for subpath in &path.subpaths {
                stroke_subpath(self.image, subpath, width, self.state.stroke);
            }
        }
    }
}

fn numbers(operation: &Operation) -> Option<Vec<f32>> {
    operation.operands.iter().map(|operand| operand.as_float().ok()).collect()
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn gray(level: f32) -> Rgba<u8> {
    let level = channel(level);
    Rgba([level, level, level, 255])
}

fn rgb(r: f32, g: f32, b: f32) -> Rgba<u8> {
    Rgba([channel(r), channel(g), channel(b), 255])
}

fn cmyk(c: f32, m: f32, y: f32, k: f32) -> Rgba<u8> {
    let k = k.clamp(0.0, 1.0);
    rgb((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k))
}

/// `sc`/`scn` carry no colour space of their own; guess it from the arity.
fn by_components(v: &[f32], count: usize) -> Option<Rgba<u8>> {
    match count {
        1 => Some(gray(v[0])),
        3 => Some(rgb(v[0], v[1], v[2])),
        4 => Some(cmyk(v[0], v[1], v[2], v[3])),
        _ => None,
    }
}

/// Scanline fill sampled at pixel centres. Every polygon is treated as
/// closed, as the fill operators require.
fn fill_polygons(image: &mut RgbaImage, polygons: &[Vec<Point>], rule: FillRule, color: Rgba<u8>) {
    let edges: Vec<(Point, Point)> = polygons
        .iter()
        .filter(|points| points.len() >= 2)
        .flat_map(|points| {
            points.iter().zip(points.iter().cycle().skip(1)).map(|(start, end)| (*start, *end))
        })
        .filter(|(start, end)| start.y != end.y)
        .collect();

    if edges.is_empty() {
        return;
    }

    let (width, height) = image.dimensions();
    let min_y = edges.iter().map(|(s, e)| s.y.min(e.y)).fold(f32::INFINITY, f32::min);
    let max_y = edges.iter().map(|(s, e)| s.y.max(e.y)).fold(f32::NEG_INFINITY, f32::max);
    let first_row = min_y.floor().max(0.0) as u32;
    let last_row = (max_y.ceil().max(0.0) as u32).min(height);

    let mut crossings: Vec<(f32, i32)> = Vec::new();
    for row in first_row..last_row {
        let sample_y = row as f32 + 0.5;
        crossings.clear();

        for (start, end) in &edges {
            let (top, bottom, winding) =
                if start.y < end.y { (start, end, 1) } else { (end, start, -1) };
            if sample_y < top.y || sample_y >= bottom.y {
                continue;
            }
            let t = (sample_y - top.y) / (bottom.y - top.y);
            crossings.push((top.x + t * (bottom.x - top.x), winding));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            let inside = match rule {
                FillRule::NonZero => winding != 0,
                FillRule::EvenOdd => winding % 2 != 0,
            };
            if inside {
                fill_span(image, row, pair[0].0, pair[1].0, width, color);
            }
        }
    }
}

fn fill_span(image: &mut RgbaImage, row: u32, from: f32, to: f32, width: u32, color: Rgba<u8>) {
    // Pixel x is covered when its centre x + 0.5 lies in [from, to).
    let first = (from - 0.5).ceil().max(0.0) as u32;
    let end = ((to - 0.5).ceil().max(0.0) as u32).min(width);
    for x in first..end {
        image.put_pixel(x, row, color);
    }
}

/// Each segment is widened into a quad and filled; joins and caps are not
/// drawn.
fn stroke_subpath(image: &mut RgbaImage, subpath: &Subpath, width: f32, color: Rgba<u8>) {
    let points = &subpath.points;
    let closing = match (subpath.closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if first != last => Some((*last, *first)),
        _ => None,
    };
    let half = width / 2.0;

    let segments = points.windows(2).map(|pair| (pair[0], pair[1])).chain(closing);
    for (start, end) in segments {
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        let length = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if length > f32::EPSILON {
            (-dy / length * half, dx / length * half)
        } else {
            (half, 0.0)
        };

        let quad = vec![
            Point { x: start.x + nx, y: start.y + ny },
            Point { x: end.x + nx, y: end.y + ny },
            Point { x: end.x - nx, y: end.y - ny },
            Point { x: start.x - nx, y: start.y - ny },
        ];
        fill_polygons(image, &[quad], FillRule::NonZero, color);
    }
}

//! Library-side workflows: adding books, onboarding and the startup route.

pub mod notify;
pub mod onboarding;
pub mod progress;
pub mod startup;
pub mod upload;

#[cfg(test)]
mod testing;

pub use notify::{Notification, ToastVariant, Toaster};
pub use onboarding::{OnboardingError, OnboardingField, OnboardingForm};
pub use progress::{ProgressMeter, ProgressTimer};
pub use startup::{process_guard, StartupGuard, StartupRoute};
pub use upload::{
    FieldErrors, PreviewJob, PreviewStatus, ResolvedPreview, SelectedFile, UploadDraft,
    UploadError, UploadField, UploadFlow, UploadState,
};

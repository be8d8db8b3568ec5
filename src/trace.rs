//! Stage instrumentation.
//!
//! Every pipeline stage opens one span tagged with its [`Stage`] and reports
//! its output size as an event inside that span. With the `tracing` feature
//! off both macros expand to nothing observable.
//!
//! [`Stage`]: crate::util::Stage

/// `stage_span!(stage, "name", field = value, ..)` opens an info span whose
/// `stage` field is the stage's display name. Call `.entered()` on the result.
#[cfg(feature = "tracing")]
macro_rules! stage_span {
    ($stage:expr, $name:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info_span!($name, stage = %$stage $(, $key = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_span {
    ($stage:expr, $name:literal $(, $key:ident = $value:expr)* $(,)?) => {{
        let _ = (&$stage $(, &$value)*);
        $crate::trace::Unspanned
    }};
}

/// `stage_count!(stage, field = value, ..)` records the sizes a stage
/// produced as a debug event.
#[cfg(feature = "tracing")]
macro_rules! stage_count {
    ($stage:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        tracing::debug!(stage = %$stage $(, $key = $value)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! stage_count {
    ($stage:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        let _ = (&$stage $(, &$value)+);
    };
}

pub(crate) use stage_count;
pub(crate) use stage_span;

/// Stand-in for `tracing::Span` without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub struct Unspanned;

#[cfg(not(feature = "tracing"))]
impl Unspanned {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}

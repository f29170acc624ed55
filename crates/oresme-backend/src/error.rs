use thiserror::Error;

/// Shader stage named by compile errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Error taxonomy shared by every backend variant.
///
/// Severity is positional, not encoded:
/// - `ShaderCompile`/`ShaderLink` occur at construction and make the backend
///   unusable;
/// - `UniformNotFound` is a per-call programming error in the shader/uniform
///   contract;
/// - `Unsupported` and `DimensionMismatch` are recoverable by the caller
///   (pick another backend / fix the input);
/// - `Device` and `Output` surface failures of the underlying device,
///   windowing, or file layer.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{stage} shader compilation failed:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("shader program link failed: {log}")]
    ShaderLink { log: String },

    #[error("uniform `{name}` not found in the active program")]
    UniformNotFound { name: String },

    #[error("`{operation}` is not implemented by this backend")]
    Unsupported { operation: &'static str },

    #[error("coordinate sequences differ in length: {xs} x values, {ys} y values")]
    DimensionMismatch { xs: usize, ys: usize },

    #[error("device error: {message}")]
    Device { message: String },

    #[error("output failed: {message}")]
    Output { message: String },
}

impl BackendError {
    #[inline]
    pub fn unsupported(operation: &'static str) -> Self {
        BackendError::Unsupported { operation }
    }

    #[inline]
    pub fn device(message: impl Into<String>) -> Self {
        BackendError::Device { message: message.into() }
    }

    #[inline]
    pub fn output(message: impl Into<String>) -> Self {
        BackendError::Output { message: message.into() }
    }
}

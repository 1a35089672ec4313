//! Error types and handling for ugly

/// Result type alias for ugly operations
pub type Result<T> = std::result::Result<T, UglyError>;

/// Error types shared by the allocators and the containers built on them
#[derive(Debug, thiserror::Error)]
pub enum UglyError {
    /// Not enough room left in the backing buffer
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Request larger than the fixed chunk size of a pool
    #[error("Chunk too large: requested {requested}, chunk size {chunk_size}")]
    ChunkTooLarge { requested: usize, chunk_size: usize },

    /// Free or reallocation of a block that is not the most recent live one
    #[error("Out of order release in {allocator} allocator at offset {offset}")]
    OutOfOrder {
        allocator: &'static str,
        offset: usize,
    },

    /// Block handed to an allocator that did not produce it
    #[error("Foreign block: address {address:#x} is not owned by this allocator")]
    ForeignBlock { address: usize },

    /// Alignment requirements not met
    #[error("Alignment error: address {address:#x} not aligned to {alignment}")]
    Alignment { address: usize, alignment: usize },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A container could not obtain backing storage from its allocator
    #[error("Out of memory: could not obtain {requested} bytes")]
    OutOfMemory {
        requested: usize,
        #[source]
        source: Box<UglyError>,
    },
}

impl UglyError {
    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create a chunk too large error
    pub fn chunk_too_large(requested: usize, chunk_size: usize) -> Self {
        Self::ChunkTooLarge {
            requested,
            chunk_size,
        }
    }

    /// Create an out of order release error
    pub fn out_of_order(allocator: &'static str, offset: usize) -> Self {
        Self::OutOfOrder { allocator, offset }
    }

    /// Create a foreign block error
    pub fn foreign_block(address: usize) -> Self {
        Self::ForeignBlock { address }
    }

    /// Create an alignment error
    pub fn alignment(address: usize, alignment: usize) -> Self {
        Self::Alignment { address, alignment }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Wrap an allocator failure raised while a container was growing
    pub fn out_of_memory(requested: usize, source: UglyError) -> Self {
        Self::OutOfMemory {
            requested,
            source: Box::new(source),
        }
    }

    /// Whether the failure is a capacity problem the caller may retry with more space
    pub fn is_exhaustion(&self) -> bool {
        match self {
            Self::InsufficientSpace { .. } | Self::ChunkTooLarge { .. } => true,
            Self::OutOfMemory { source, .. } => source.is_exhaustion(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = UglyError::insufficient_space(1024, 512);
        assert!(matches!(err, UglyError::InsufficientSpace { .. }));

        let err = UglyError::out_of_order("stack", 32);
        assert!(matches!(
            err,
            UglyError::OutOfOrder {
                allocator: "stack",
                offset: 32
            }
        ));

        let err = UglyError::chunk_too_large(64, 16);
        assert!(err.is_exhaustion());
    }

    #[test]
    fn test_error_display() {
        let err = UglyError::invalid_parameter("size", "Size must be greater than 0");
        let display = format!("{}", err);
        assert!(display.contains("Invalid parameter"));
        assert!(display.contains("Size must be greater than 0"));
    }

    #[test]
    fn test_out_of_memory_keeps_source() {
        use std::error::Error;

        let err = UglyError::out_of_memory(256, UglyError::insufficient_space(256, 10));
        assert!(err.is_exhaustion());
        let source = err.source().expect("source is kept");
        assert!(source.to_string().contains("Insufficient space"));
    }
}

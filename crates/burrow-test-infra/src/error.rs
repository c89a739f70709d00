use thiserror::Error;

/// Failure while starting or inspecting a test container.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("test container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}

pub type Result<T, E = TestInfraError> = std::result::Result<T, E>;

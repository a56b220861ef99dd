pub mod context;
pub mod pipeline;
pub mod renderer;
pub mod uniforms;

pub use context::GpuContext;
pub use renderer::GpuBackend;

pub mod streets;

pub use streets::Streets;

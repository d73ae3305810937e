pub mod gemini;
pub mod http;
pub mod huggingface;
pub mod memory;
pub mod openai;
pub mod postgres;

pub use gemini::GeminiAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use memory::MemoryPlanRepository;
pub use openai::OpenAiAdapter;
pub use postgres::PgPlanRepository;

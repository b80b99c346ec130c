pub mod ai_provider;
pub mod model_selector;
pub mod providers;
pub mod task_generator;

pub use ai_provider::TextGenerator;
pub use model_selector::{
    parse_capabilities, rank, select_best, ModelCandidate, ModelCapabilities, SelectionError, Tier,
};
pub use providers::google::GoogleGenAiProvider;
pub use task_generator::{
    build_prompt, parse_task_csv, GeneratedTask, TaskGenerator, WorkPreferences, TASK_CSV_HEADER,
};

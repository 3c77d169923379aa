pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use io::{
    InputError, QaTable, QaTableMetadata, TableFormat, parse_templates_file, parse_utterance_csv,
    parse_utterance_file, parse_utterance_json, write_table,
};
pub use llm::{
    AnthropicClient, AnthropicConfig, Classifier, ClassifierGateway, ClassifyRequest, GatewayConfig,
};
pub use models::{
    ColumnScheme, QaRecord, QuestionSlot, TemplateSet, Transcript, Utterance, Verdict, assemble,
};
pub use stages::{
    AlignConfig, AlignmentMachine, AlignmentResult, AlignmentStats, BatchConfig, RenderConfig,
    TranscriptSummary, execute_alignment, execute_batch, execute_render, process_transcript,
};

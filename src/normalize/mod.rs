pub mod fields;
pub mod jsonl;

pub use fields::{convert_unicode_to_tibetan, get_writing_type, parse_image_url, review_codes};
pub use jsonl::{
    convert_jsonl_dir_to_csv, convert_jsonl_to_csv, convert_path, list_jsonl_files,
    parse_jsonl_line, process_jsonl_entry, AnnotationEntry, ConversionSummary,
};

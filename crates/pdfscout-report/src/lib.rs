mod metadata;
mod report;

pub use metadata::{human_size, parse_pdf_date, PdfProperties};
pub use report::{dump_registry, write_report, PdfRecord};

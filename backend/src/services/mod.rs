pub mod analyzer;
pub mod charts;
pub mod collector;
pub mod mailer;
pub mod pipeline;
pub mod pptx;
pub mod report;
pub mod storage;

//! Phytoscope Common Library
//!
//! 検出結果の型とラベルXML形式を、CLIとテストで共有する

pub mod error;
pub mod label_xml;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use label_xml::{build_label_xml, parse_label_xml, LabelFile, LabelObject};
pub use parser::{extract_json, parse_detector_output};
pub use types::{BBox, Detection, RawDetection};

// ==========================================
// 工厂设备维护管理 - 导入层
// ==========================================
// 职责: 外部传感器数据导入
// 支持: Excel, CSV
// ==========================================

pub mod error;
pub mod file_parser;
pub mod reading_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawTable, UniversalFileParser};
pub use reading_importer::{ImportSummary, ReadingImporter, RowRejection};

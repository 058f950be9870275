//! 实用工具模块
//!
//! 提供文件、JSON 编码与系统信息相关的辅助函数

pub mod file_tools;
pub mod json;
pub mod system_info;

pub use file_tools::FileTools;
pub use system_info::ProcessSystemInfo;

//! 计分引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("规则表解析失败: {0}")]
    ParseError(String),

    #[error("定义 ID 重复: {0}")]
    DuplicateId(String),

    #[error("定义字段为空: id={id}, field={field}")]
    EmptyField { id: String, field: &'static str },

    #[error("阈值必须大于 0: {0}")]
    InvalidThreshold(String),

    #[error("徽章等级重复: {0}")]
    DuplicateRank(String),

    #[error("徽章阶梯阈值未严格递增: {lower} -> {higher}")]
    LadderNotAscending { lower: String, higher: String },

    #[error("读取规则表文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

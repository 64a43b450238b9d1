//! 专利文档记录类型
//!
//! 文档解析协作方从压缩包中拆分出的结构化记录，
//! 由输出分发器交给各格式输出器消费，每条记录恰好被消费一次。

use serde::{Deserialize, Serialize};

/// 文档在压缩包内的来源信息
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// 来源压缩包文件名
    pub origin_zip: String,
    /// 压缩包内的序号名，用于派生 XML/HTML 输出文件名
    pub index_name: String,
    /// 文档类型（根元素名，如 us-patent-grant）
    pub document_type: String,
}

/// 公开引用的文档标识
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationReference {
    /// 国家
    pub country: String,
    /// 文档号
    pub doc_number: String,
    /// 类型代码
    pub kind_code: String,
    /// 公开日期
    pub date: String,
}

/// 国家分类号
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationNational {
    /// 国家
    pub country: String,
    /// 主分类号
    pub main_classification: String,
    /// 副分类号
    pub further_classification: String,
}

/// 专利著录与正文字段
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patent {
    /// 著录元数据中的文档文件名
    pub meta_file_name: String,
    /// 制作日期
    pub date_produced: String,
    /// 公开日期
    pub date_publ: String,
    /// 国家
    pub country: String,
    /// 发明名称
    pub invention_title: String,
    /// 权利要求数
    pub number_of_claims: i64,
    /// 摘要
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// 说明书
    pub description: String,
    /// 权利要求书
    pub claims: String,
    /// 公开引用
    pub publication_reference: PublicationReference,
    /// 国家分类
    pub classification_national: ClassificationNational,
}

/// 单个专利文档记录
///
/// `raw` 仅在解析请求要求保留原始序列化内容时存在，
/// 只供 XML 输出路径使用，不参与 JSON 序列化。
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentDoc {
    /// 来源信息
    pub metadata: DocMetadata,
    /// 专利字段
    pub patent: Patent,
    /// 原始序列化内容
    #[serde(skip)]
    pub raw: Option<Vec<u8>>,
}

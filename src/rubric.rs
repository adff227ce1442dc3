//! The fixed eleven-criterion scoring rubric.
//!
//! Criteria, ceilings and category groupings are constants: the judge
//! prompt, the table parser and the report exporters all read from here.

use serde::{Deserialize, Serialize};

/// Aggregate grouping of criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ContentQuality,
    ContentNorms,
    Creativity,
    EthicsSafety,
}

impl Category {
    /// All categories in rubric order.
    pub const ALL: [Category; 4] = [
        Category::ContentQuality,
        Category::ContentNorms,
        Category::Creativity,
        Category::EthicsSafety,
    ];

    /// Localized label as it appears in the judge table.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ContentQuality => "内容质量",
            Category::ContentNorms => "内容规范性",
            Category::Creativity => "创意能力",
            Category::EthicsSafety => "伦理与安全",
        }
    }

    /// English name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::ContentQuality => "Content quality",
            Category::ContentNorms => "Content norms",
            Category::Creativity => "Creativity",
            Category::EthicsSafety => "Ethics & safety",
        }
    }
}

/// Static descriptor of one scoring criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    /// Stable short token, also the field name in a `ScoreSet`.
    pub id: &'static str,
    /// English label.
    pub display_name: &'static str,
    /// Localized label used in the judge prompt and table rows.
    pub label: &'static str,
    /// Point ceiling.
    pub max_points: u32,
    pub category: Category,
}

const fn criterion(
    id: &'static str,
    display_name: &'static str,
    label: &'static str,
    max_points: u32,
    category: Category,
) -> Criterion {
    Criterion {
        id,
        display_name,
        label,
        max_points,
        category,
    }
}

/// The eleven criteria, in rubric order.
pub const CRITERIA: [Criterion; 11] = [
    criterion("relevance", "Relevance", "相关性", 4, Category::ContentQuality),
    criterion("accuracy", "Accuracy", "准确性", 4, Category::ContentQuality),
    criterion("information", "Information", "信息量", 3, Category::ContentQuality),
    criterion("fluency", "Fluency", "流畅性", 2, Category::ContentNorms),
    criterion("grammar", "Grammar", "语法正确性", 2, Category::ContentNorms),
    criterion("style", "Style fit", "风格适配性", 2, Category::ContentNorms),
    criterion("innovation", "Innovation", "创新性", 4, Category::Creativity),
    criterion("appeal", "Appeal", "吸引力", 3, Category::Creativity),
    criterion("fairness", "Bias & fairness", "偏见与公平性", 2, Category::EthicsSafety),
    criterion("safety", "Content safety", "内容安全", 2, Category::EthicsSafety),
    criterion("compliance", "Compliance", "合规性", 2, Category::EthicsSafety),
];

/// Accessors over the fixed rubric.
pub struct Rubric;

impl Rubric {
    /// All criteria in rubric order.
    pub fn criteria() -> &'static [Criterion] {
        &CRITERIA
    }

    /// Sum of all ceilings (30).
    pub fn total_ceiling() -> u32 {
        CRITERIA.iter().map(|c| c.max_points).sum()
    }

    /// Sum of the ceilings of one category.
    pub fn category_ceiling(category: Category) -> u32 {
        CRITERIA
            .iter()
            .filter(|c| c.category == category)
            .map(|c| c.max_points)
            .sum()
    }

    /// Criterion by its id.
    pub fn criterion(id: &str) -> Option<&'static Criterion> {
        CRITERIA.iter().find(|c| c.id == id)
    }

    /// Find the first criterion named in `text`.
    ///
    /// The localized label must occur verbatim; the English display name
    /// is matched ASCII case-insensitively.
    pub fn criterion_by_alias(text: &str) -> Option<&'static Criterion> {
        let lowered = text.to_ascii_lowercase();
        CRITERIA.iter().find(|c| {
            text.contains(c.label) || lowered.contains(&c.display_name.to_ascii_lowercase())
        })
    }
}

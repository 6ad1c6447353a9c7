//! Poster layout planning.
//!
//! Produces the declarative layout (grid shape, scales, element overrides)
//! that the renderer applies before rasterising. Measurement-driven helpers
//! take the measurement as a closure so the renderer stays in charge of it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MIN_COLUMNS: u8 = 1;
const MAX_COLUMNS: u8 = 3;

/// Preview canvas widths, in CSS pixels.
const LANDSCAPE_PREVIEW_WIDTH: u32 = 800;
const PORTRAIT_PREVIEW_WIDTH: u32 = 500;

// Text shrink bounds, in hundredths of a rem
const SHRINK_STEP: u32 = 5;
const SHRINK_FLOOR: u32 = 50;

const FIT_MARGIN: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatId {
    A4,
    Story,
    Feed,
    Tv,
}

impl FormatId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::A4 => "a4",
            FormatId::Story => "story",
            FormatId::Feed => "feed",
            FormatId::Tv => "tv",
        }
    }

    /// Export size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FormatId::A4 => (2480, 3508),
            FormatId::Story => (1080, 1920),
            FormatId::Feed => (1080, 1080),
            FormatId::Tv => (1920, 1080),
        }
    }

    pub fn default_columns(&self) -> u8 {
        match self {
            FormatId::Tv => 3,
            FormatId::A4 | FormatId::Story | FormatId::Feed => 2,
        }
    }

    /// Scale applied to the header title and subtitle by the format preset.
    pub fn header_scale(&self) -> f64 {
        match self {
            FormatId::Story => 1.1,
            FormatId::Tv => 0.9,
            FormatId::A4 | FormatId::Feed => 1.0,
        }
    }

    pub fn is_landscape(&self) -> bool {
        let (w, h) = self.dimensions();
        w > h
    }

    pub fn is_square(&self) -> bool {
        let (w, h) = self.dimensions();
        w == h
    }

    pub fn font_scale(&self) -> f64 {
        match self {
            FormatId::Story => 1.2,
            _ if self.is_square() => 0.9,
            _ => 1.0,
        }
    }

    pub fn preview_width(&self) -> u32 {
        if self.is_landscape() {
            LANDSCAPE_PREVIEW_WIDTH
        } else {
            PORTRAIT_PREVIEW_WIDTH
        }
    }

    /// Transform scale that turns the preview canvas into the export size.
    pub fn export_scale(&self) -> f64 {
        f64::from(self.dimensions().0) / f64::from(self.preview_width())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementTransform {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl Default for ElementTransform {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: 1.0 }
    }
}

/// Manual offsets for the parts of a product card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementLayout {
    #[serde(default)]
    pub image: ElementTransform,
    #[serde(default)]
    pub name: ElementTransform,
    #[serde(default)]
    pub price: ElementTransform,
    #[serde(default)]
    pub description: ElementTransform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutProduct {
    pub id: String,
    /// Overrides keyed by format id (`"a4"`, `"story"`...).
    #[serde(default)]
    pub layouts: HashMap<String, ElementLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub format: FormatId,
    #[serde(default)]
    pub products: Vec<LayoutProduct>,
    pub columns: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Hero,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPlan {
    pub product_id: String,
    pub elements: ElementLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPlan {
    pub format: FormatId,
    pub width: u32,
    pub height: u32,
    pub mode: LayoutMode,
    pub columns: u8,
    pub rows: u32,
    pub font_scale: f64,
    pub header_scale: f64,
    pub compact: bool,
    pub name_font_rem: f64,
    pub image_height_percent: u8,
    pub preview_width: u32,
    pub export_scale: f64,
    pub cards: Vec<CardPlan>,
}

pub fn plan_layout(request: &LayoutRequest) -> Result<LayoutPlan, AppError> {
    let format = request.format;
    let columns = match request.columns {
        Some(0) => return Err(AppError::BadRequest("columns must be at least 1".to_string())),
        Some(requested) => requested.clamp(MIN_COLUMNS, MAX_COLUMNS),
        None => format.default_columns(),
    };

    let count = request.products.len();
    let mode = if count == 1 { LayoutMode::Hero } else { LayoutMode::Grid };
    let rows = (count.div_ceil(usize::from(columns))).max(1) as u32;
    let compact = columns >= 3;
    let (width, height) = format.dimensions();

    let cards = request
        .products
        .iter()
        .map(|product| CardPlan {
            product_id: product.id.clone(),
            elements: product
                .layouts
                .get(format.as_str())
                .copied()
                .unwrap_or_default(),
        })
        .collect();

    Ok(LayoutPlan {
        format,
        width,
        height,
        mode,
        columns,
        rows,
        font_scale: format.font_scale(),
        header_scale: format.header_scale(),
        compact,
        name_font_rem: if compact { 0.8 } else { 1.0 },
        image_height_percent: if compact { 50 } else { 60 },
        preview_width: format.preview_width(),
        export_scale: format.export_scale(),
        cards,
    })
}

/// Steps a font size (rem) down by 0.05 while `overflows` reports overflow,
/// never going below 0.5.
pub fn shrink_to_fit(start_rem: f64, mut overflows: impl FnMut(f64) -> bool) -> f64 {
    let mut size = (start_rem * 100.0).round().max(0.0) as u32;
    while size > SHRINK_FLOOR && overflows(f64::from(size) / 100.0) {
        size = size.saturating_sub(SHRINK_STEP).max(SHRINK_FLOOR);
    }
    f64::from(size) / 100.0
}

/// Scale that fits `content_width` inside `parent_width`, with a margin.
pub fn fit_to_width(parent_width: f64, content_width: f64) -> f64 {
    if content_width > parent_width && content_width > 0.0 {
        FIT_MARGIN * parent_width / content_width
    } else {
        1.0
    }
}

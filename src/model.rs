//! Data model – templates, elements, blocks, block instances and bindings.
//!
//! All geometry is in millimetres with a top-left origin. An element's `x`/`y`
//! are relative to its parent's resolved top-left corner (or to the page for
//! top-level items, or to the block canvas for block elements).
//!
//! Per-kind properties are a tagged union ([`ElementProps`]). Every props
//! struct also carries a string-keyed `extra` map so that bindings can target
//! properties the typed model does not know about.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Millimetre → point factor (1 mm = 2.83465 pt).
pub const MM_TO_PT: f32 = 2.83465;

/// Format version written by this crate.
pub const CURRENT_VERSION: &str = "0.0.2";

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * MM_TO_PT
}

pub fn pt_to_mm(pt: f32) -> f32 {
    pt / MM_TO_PT
}

/// Global variable map shared by the whole template.
pub type Variables = BTreeMap<String, Value>;

pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn current_version() -> String {
    CURRENT_VERSION.to_string()
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// A4 portrait, 210 × 297 mm.
    pub fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    /// Top margin applied to content continued onto a following page.
    #[serde(default, alias = "page_top_margin_mm")]
    pub page_top_margin_mm: f32,
}

/// A document template: page size, settings and top-level items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "current_version")]
    pub version: String,
    #[serde(alias = "page_size")]
    pub page_size: PageSize,
    #[serde(default)]
    pub settings: TemplateSettings,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

impl Template {
    pub fn new(name: impl Into<String>, page_size: PageSize) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            version: current_version(),
            page_size,
            settings: TemplateSettings::default(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: impl Into<TemplateItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn with_top_margin(mut self, mm: f32) -> Self {
        self.settings.page_top_margin_mm = mm;
        self
    }
}

/// A top-level template item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateItem {
    Element(Element),
    Instance(BlockInstance),
}

impl From<Element> for TemplateItem {
    fn from(e: Element) -> Self {
        TemplateItem::Element(e)
    }
}

impl From<BlockInstance> for TemplateItem {
    fn from(i: BlockInstance) -> Self {
        TemplateItem::Instance(i)
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A reusable group of elements in its own local coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A placed, data-bound use of a [`Block`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInstance {
    #[serde(default = "generate_id")]
    pub id: String,
    #[serde(alias = "block_id")]
    pub block_id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Substitution data visible only inside this instance.
    #[serde(default)]
    pub data: Variables,
}

impl BlockInstance {
    pub fn new(block_id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id: generate_id(),
            block_id: block_id.into(),
            x,
            y,
            data: Variables::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Resolves block ids to block definitions.
pub trait BlockLookup {
    fn block(&self, id: &str) -> Option<&Block>;
}

impl BlockLookup for HashMap<String, Block> {
    fn block(&self, id: &str) -> Option<&Block> {
        self.get(id)
    }
}

impl BlockLookup for BTreeMap<String, Block> {
    fn block(&self, id: &str) -> Option<&Block> {
        self.get(id)
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// Maps a global variable onto an element property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    #[serde(alias = "variable_name")]
    pub variable_name: String,
    #[serde(alias = "target_property")]
    pub target_property: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Rect,
    Text,
    TextBox,
    Line,
    Image,
    KvBox,
    Container,
    Table,
}

/// A positioned visual element, possibly with nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawElement", into = "RawElement")]
pub struct Element {
    pub id: String,
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub props: ElementProps,
    pub bindings: Vec<Binding>,
    pub children: Vec<Element>,
}

/// Wire shape of an [`Element`]: `kind` selects how `props` is decoded.
#[derive(Serialize, Deserialize)]
struct RawElement {
    #[serde(default = "generate_id")]
    id: String,
    #[serde(alias = "type")]
    kind: ElementKind,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    props: Value,
    #[serde(default)]
    bindings: Vec<Binding>,
    #[serde(default)]
    children: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl TryFrom<RawElement> for Element {
    type Error = serde_json::Error;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        Ok(Self {
            props: ElementProps::from_value(raw.kind, raw.props)?,
            id: raw.id,
            name: raw.name,
            x: raw.x,
            y: raw.y,
            width: raw.width,
            height: raw.height,
            bindings: raw.bindings,
            children: raw.children,
        })
    }
}

impl From<Element> for RawElement {
    fn from(e: Element) -> Self {
        Self {
            kind: e.props.kind(),
            props: e.props.props_value(),
            id: e.id,
            x: e.x,
            y: e.y,
            width: e.width,
            height: e.height,
            bindings: e.bindings,
            children: e.children,
            name: e.name,
        }
    }
}

impl Element {
    pub fn new(id: impl Into<String>, props: ElementProps) -> Self {
        Self {
            id: id.into(),
            name: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            props,
            bindings: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_binding(
        mut self,
        variable_name: impl Into<String>,
        target_property: impl Into<String>,
    ) -> Self {
        self.bindings.push(Binding {
            variable_name: variable_name.into(),
            target_property: target_property.into(),
        });
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.props.kind()
    }

    /// Apply a bound value to a property by name. See [`ElementProps::set`].
    pub fn set_property(&mut self, name: &str, value: &Value) {
        self.props.set(name, value);
    }
}

// ---------------------------------------------------------------------------
// Per-kind properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "props", rename_all = "snake_case")]
pub enum ElementProps {
    Rect(RectProps),
    Text(TextProps),
    TextBox(TextBoxProps),
    Line(LineProps),
    Image(ImageProps),
    KvBox(KvBoxProps),
    Container(ContainerProps),
    Table(TableProps),
}

impl ElementProps {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementProps::Rect(_) => ElementKind::Rect,
            ElementProps::Text(_) => ElementKind::Text,
            ElementProps::TextBox(_) => ElementKind::TextBox,
            ElementProps::Line(_) => ElementKind::Line,
            ElementProps::Image(_) => ElementKind::Image,
            ElementProps::KvBox(_) => ElementKind::KvBox,
            ElementProps::Container(_) => ElementKind::Container,
            ElementProps::Table(_) => ElementKind::Table,
        }
    }

    /// Decode a `props` object for the given kind. `null` decodes to defaults.
    pub fn from_value(kind: ElementKind, value: Value) -> Result<Self, serde_json::Error> {
        let value = if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        };
        Ok(match kind {
            ElementKind::Rect => ElementProps::Rect(serde_json::from_value(value)?),
            ElementKind::Text => ElementProps::Text(serde_json::from_value(value)?),
            ElementKind::TextBox => ElementProps::TextBox(serde_json::from_value(value)?),
            ElementKind::Line => ElementProps::Line(serde_json::from_value(value)?),
            ElementKind::Image => ElementProps::Image(serde_json::from_value(value)?),
            ElementKind::KvBox => ElementProps::KvBox(serde_json::from_value(value)?),
            ElementKind::Container => ElementProps::Container(serde_json::from_value(value)?),
            ElementKind::Table => ElementProps::Table(serde_json::from_value(value)?),
        })
    }

    fn props_value(&self) -> Value {
        let encoded = match self {
            ElementProps::Rect(p) => serde_json::to_value(p),
            ElementProps::Text(p) => serde_json::to_value(p),
            ElementProps::TextBox(p) => serde_json::to_value(p),
            ElementProps::Line(p) => serde_json::to_value(p),
            ElementProps::Image(p) => serde_json::to_value(p),
            ElementProps::KvBox(p) => serde_json::to_value(p),
            ElementProps::Container(p) => serde_json::to_value(p),
            ElementProps::Table(p) => serde_json::to_value(p),
        };
        encoded.unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        ElementProps::Text(TextProps {
            text: text.into(),
            ..TextProps::default()
        })
    }

    pub fn text_box(text: impl Into<String>) -> Self {
        ElementProps::TextBox(TextBoxProps {
            text: text.into(),
            ..TextBoxProps::default()
        })
    }

    pub fn table(rows: Vec<Vec<String>>) -> Self {
        ElementProps::Table(TableProps {
            data: rows,
            ..TableProps::default()
        })
    }

    pub fn rect() -> Self {
        ElementProps::Rect(RectProps::default())
    }

    pub fn container() -> Self {
        ElementProps::Container(ContainerProps::default())
    }

    fn extra(&self) -> &BTreeMap<String, Value> {
        match self {
            ElementProps::Rect(p) => &p.extra,
            ElementProps::Text(p) => &p.extra,
            ElementProps::TextBox(p) => &p.extra,
            ElementProps::Line(p) => &p.extra,
            ElementProps::Image(p) => &p.extra,
            ElementProps::KvBox(p) => &p.extra,
            ElementProps::Container(p) => &p.extra,
            ElementProps::Table(p) => &p.extra,
        }
    }

    fn extra_mut(&mut self) -> &mut BTreeMap<String, Value> {
        match self {
            ElementProps::Rect(p) => &mut p.extra,
            ElementProps::Text(p) => &mut p.extra,
            ElementProps::TextBox(p) => &mut p.extra,
            ElementProps::Line(p) => &mut p.extra,
            ElementProps::Image(p) => &mut p.extra,
            ElementProps::KvBox(p) => &mut p.extra,
            ElementProps::Container(p) => &mut p.extra,
            ElementProps::Table(p) => &mut p.extra,
        }
    }

    /// Look up a property that is not part of the typed model.
    pub fn extra_value(&self, name: &str) -> Option<&Value> {
        self.extra().get(name)
    }

    /// Legacy single-variable binding stored as `variable_name` in the props.
    pub fn legacy_variable(&self) -> Option<&str> {
        self.extra().get("variable_name").and_then(Value::as_str)
    }

    /// Replace the kind's primary content (text, image path or table data).
    /// Returns `false` for kinds that have no primary content.
    pub fn set_primary_content(&mut self, value: &Value) -> bool {
        let target = match self {
            ElementProps::Text(_) | ElementProps::TextBox(_) | ElementProps::KvBox(_) => "text",
            ElementProps::Image(_) => "image_path",
            ElementProps::Table(_) => "data",
            _ => return false,
        };
        self.set(target, value);
        true
    }

    /// Apply a bound value to the property called `name`.
    ///
    /// Typed fields are coerced from the JSON value; a value that cannot be
    /// coerced leaves the field unchanged. Unknown names land in `extra`.
    pub fn set(&mut self, name: &str, value: &Value) {
        let handled = match self {
            ElementProps::Rect(p) => p.set(name, value),
            ElementProps::Text(p) => p.set(name, value),
            ElementProps::TextBox(p) => p.set(name, value),
            ElementProps::Line(p) => p.set(name, value),
            ElementProps::Image(p) => p.set(name, value),
            ElementProps::KvBox(p) => p.set(name, value),
            ElementProps::Container(p) => p.set(name, value),
            ElementProps::Table(p) => p.set(name, value),
        };
        match handled {
            Assign::Done => {}
            Assign::Rejected => {
                log::warn!("value {value} cannot be assigned to property '{name}'; left unchanged");
            }
            Assign::Unknown => {
                self.extra_mut().insert(name.to_string(), value.clone());
            }
        }
    }
}

/// Outcome of assigning a bound value to a typed field.
enum Assign {
    Done,
    Rejected,
    Unknown,
}

impl From<bool> for Assign {
    fn from(ok: bool) -> Self {
        if ok {
            Assign::Done
        } else {
            Assign::Rejected
        }
    }
}

/// Render a bound value as display text. Strings are used verbatim.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn assign_f32(slot: &mut f32, value: &Value) -> Assign {
    let parsed = match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) => {
            *slot = v;
            Assign::Done
        }
        None => Assign::Rejected,
    }
}

fn assign_bool(slot: &mut bool, value: &Value) -> Assign {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    };
    match parsed {
        Some(b) => {
            *slot = b;
            Assign::Done
        }
        None => Assign::Rejected,
    }
}

fn assign_text(slot: &mut String, value: &Value) -> Assign {
    *slot = value_to_text(value);
    Assign::Done
}

fn assign_enum<T: serde::de::DeserializeOwned>(slot: &mut T, value: &Value) -> Assign {
    match serde_json::from_value(value.clone()) {
        Ok(v) => {
            *slot = v;
            Assign::Done
        }
        Err(_) => Assign::Rejected,
    }
}

/// Convert a JSON value into a table matrix. Scalar cells are stringified;
/// a single row may be given as a flat array.
pub fn value_to_rows(value: &Value) -> Option<Vec<Vec<String>>> {
    let rows = value.as_array()?;
    if rows.iter().all(|r| !r.is_array()) {
        return Some(vec![rows.iter().map(value_to_text).collect()]);
    }
    rows.iter()
        .map(|row| row.as_array().map(|cells| cells.iter().map(value_to_text).collect()))
        .collect()
}

fn deserialize_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    value_to_rows(&value)
        .ok_or_else(|| serde::de::Error::custom("table data must be an array of rows"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

/// Font selection shared by all text-bearing kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: String,
    pub align: TextAlign,
}

/// Line height used for wrapped text, in points.
pub fn line_height_pt(font_size: f32) -> f32 {
    font_size * 1.2
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn black() -> String {
    "black".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectProps {
    pub fill_color: Option<String>,
    pub stroke_color: Option<String>,
    pub show_outline: bool,
    pub stroke_width: f32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for RectProps {
    fn default() -> Self {
        Self {
            fill_color: None,
            stroke_color: None,
            show_outline: false,
            stroke_width: 1.0,
            extra: BTreeMap::new(),
        }
    }
}

impl RectProps {
    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "fill_color" => {
                self.fill_color = Some(value_to_text(value));
                Assign::Done
            }
            "stroke_color" => {
                self.stroke_color = Some(value_to_text(value));
                Assign::Done
            }
            "show_outline" => assign_bool(&mut self.show_outline, value),
            "stroke_width" => assign_f32(&mut self.stroke_width, value),
            _ => Assign::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_bold: bool,
    pub font_italic: bool,
    pub color: String,
    pub text_align: TextAlign,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: default_font_family(),
            font_size: 12.0,
            font_bold: false,
            font_italic: false,
            color: black(),
            text_align: TextAlign::Left,
            extra: BTreeMap::new(),
        }
    }
}

impl TextProps {
    pub fn style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            bold: self.font_bold,
            italic: self.font_italic,
            color: self.color.clone(),
            align: self.text_align,
        }
    }

    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "text" => assign_text(&mut self.text, value),
            "font_family" => assign_text(&mut self.font_family, value),
            "font_size" => assign_f32(&mut self.font_size, value),
            "font_bold" => assign_bool(&mut self.font_bold, value),
            "font_italic" => assign_bool(&mut self.font_italic, value),
            "color" => assign_text(&mut self.color, value),
            "text_align" => assign_enum(&mut self.text_align, value),
            _ => Assign::Unknown,
        }
    }
}

/// A text element whose height follows its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBoxProps {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_bold: bool,
    pub font_italic: bool,
    pub color: String,
    pub text_align: TextAlign,
    /// Design-time height; the floor for content-driven growth.
    pub base_height: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TextBoxProps {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: default_font_family(),
            font_size: 12.0,
            font_bold: false,
            font_italic: false,
            color: black(),
            text_align: TextAlign::Left,
            base_height: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TextBoxProps {
    pub fn style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            bold: self.font_bold,
            italic: self.font_italic,
            color: self.color.clone(),
            align: self.text_align,
        }
    }

    /// Line height in millimetres.
    pub fn line_height_mm(&self) -> f32 {
        pt_to_mm(line_height_pt(self.font_size))
    }

    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "text" => assign_text(&mut self.text, value),
            "font_family" => assign_text(&mut self.font_family, value),
            "font_size" => assign_f32(&mut self.font_size, value),
            "font_bold" => assign_bool(&mut self.font_bold, value),
            "font_italic" => assign_bool(&mut self.font_italic, value),
            "color" => assign_text(&mut self.color, value),
            "text_align" => assign_enum(&mut self.text_align, value),
            "base_height" => {
                let mut h = self.base_height.unwrap_or(0.0);
                let outcome = assign_f32(&mut h, value);
                if matches!(outcome, Assign::Done) {
                    self.base_height = Some(h);
                }
                outcome
            }
            _ => Assign::Unknown,
        }
    }
}

/// A straight line from the element origin to (`x2`, `y2`).
///
/// The end point shares the coordinate space of the element's `x`/`y`. When
/// absent, the end point is the far corner of the element box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineProps {
    pub x2: Option<f32>,
    pub y2: Option<f32>,
    pub stroke_color: String,
    pub stroke_width: f32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for LineProps {
    fn default() -> Self {
        Self {
            x2: None,
            y2: None,
            stroke_color: black(),
            stroke_width: 1.0,
            extra: BTreeMap::new(),
        }
    }
}

impl LineProps {
    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "x2" | "y2" => {
                let slot = if name == "x2" { &mut self.x2 } else { &mut self.y2 };
                let mut v = slot.unwrap_or(0.0);
                let outcome = assign_f32(&mut v, value);
                if matches!(outcome, Assign::Done) {
                    *slot = Some(v);
                }
                outcome
            }
            "stroke_color" => assign_text(&mut self.stroke_color, value),
            "stroke_width" => assign_f32(&mut self.stroke_width, value),
            _ => Assign::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProps {
    /// File path or `data:` URI.
    pub image_path: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ImageProps {
    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "image_path" => assign_text(&mut self.image_path, value),
            _ => Assign::Unknown,
        }
    }
}

/// How a key/value box divides its width between key and value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Ratio,
    Fixed,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvBoxProps {
    pub key_text: String,
    pub text: String,
    pub split_type: SplitType,
    pub split_ratio: f32,
    /// Key column width in millimetres for [`SplitType::Fixed`].
    pub split_fixed: f32,
    pub show_outline: bool,
    pub stroke_width: f32,
    pub border_color: String,
    pub divider_color: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_bold: bool,
    pub font_italic: bool,
    pub color: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for KvBoxProps {
    fn default() -> Self {
        Self {
            key_text: "Label:".to_string(),
            text: "[Value]".to_string(),
            split_type: SplitType::Ratio,
            split_ratio: 0.4,
            split_fixed: 20.0,
            show_outline: true,
            stroke_width: 0.5,
            border_color: black(),
            divider_color: black(),
            font_family: default_font_family(),
            font_size: 10.0,
            font_bold: false,
            font_italic: false,
            color: black(),
            extra: BTreeMap::new(),
        }
    }
}

impl KvBoxProps {
    pub fn style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            bold: self.font_bold,
            italic: self.font_italic,
            color: self.color.clone(),
            align: TextAlign::Left,
        }
    }

    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "key_text" => assign_text(&mut self.key_text, value),
            "text" => assign_text(&mut self.text, value),
            "split_type" => assign_enum(&mut self.split_type, value),
            "split_ratio" => assign_f32(&mut self.split_ratio, value),
            "split_fixed" => assign_f32(&mut self.split_fixed, value),
            "show_outline" => assign_bool(&mut self.show_outline, value),
            "stroke_width" => assign_f32(&mut self.stroke_width, value),
            "border_color" => assign_text(&mut self.border_color, value),
            "divider_color" => assign_text(&mut self.divider_color, value),
            "font_family" => assign_text(&mut self.font_family, value),
            "font_size" => assign_f32(&mut self.font_size, value),
            "font_bold" => assign_bool(&mut self.font_bold, value),
            "font_italic" => assign_bool(&mut self.font_italic, value),
            "color" => assign_text(&mut self.color, value),
            _ => Assign::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Transparent,
    Solid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerProps {
    pub bg_type: BackgroundType,
    pub fill_color: String,
    pub show_outline: bool,
    pub stroke_color: String,
    pub stroke_width: f32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ContainerProps {
    fn default() -> Self {
        Self {
            bg_type: BackgroundType::Transparent,
            fill_color: "#ffffff".to_string(),
            show_outline: false,
            stroke_color: black(),
            stroke_width: 1.0,
            extra: BTreeMap::new(),
        }
    }
}

impl ContainerProps {
    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "bg_type" => assign_enum(&mut self.bg_type, value),
            "fill_color" => assign_text(&mut self.fill_color, value),
            "show_outline" => assign_bool(&mut self.show_outline, value),
            "stroke_color" => assign_text(&mut self.stroke_color, value),
            "stroke_width" => assign_f32(&mut self.stroke_width, value),
            _ => Assign::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableTheme {
    Simple,
    #[default]
    Grid,
    Striped,
    Dark,
}

impl TableTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableTheme::Simple => "Simple",
            TableTheme::Grid => "Grid",
            TableTheme::Striped => "Striped",
            TableTheme::Dark => "Dark",
        }
    }
}

/// Number of rows a table is assumed to have been designed with.
pub const DEFAULT_DESIGN_ROW_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableProps {
    #[serde(deserialize_with = "deserialize_rows")]
    pub data: Vec<Vec<String>>,
    pub font_size: f32,
    pub show_header: bool,
    pub theme: TableTheme,
    pub stroke_color: String,
    pub header_bg_color: Option<String>,
    /// Column widths in millimetres; evenly distributed when absent.
    pub col_widths: Option<Vec<f32>>,
    /// Design-time height, captured on first sizing.
    pub base_height: Option<f32>,
    /// Row count the design height corresponds to.
    pub num_rows_editor: Option<usize>,
    /// Uniform row height in millimetres, set by the sizing pass.
    pub row_height: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TableProps {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            font_size: 10.0,
            show_header: true,
            theme: TableTheme::Grid,
            stroke_color: black(),
            header_bg_color: None,
            col_widths: None,
            base_height: None,
            num_rows_editor: None,
            row_height: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TableProps {
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn column_count(&self) -> usize {
        self.data.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Row height for a table of the given total height, preferring the value
    /// recorded by the sizing pass.
    pub fn effective_row_height(&self, height: f32) -> f32 {
        match self.row_height {
            Some(h) => h,
            None if !self.data.is_empty() => height / self.data.len() as f32,
            None => 0.0,
        }
    }

    fn set(&mut self, name: &str, value: &Value) -> Assign {
        match name {
            "data" => match value_to_rows(value) {
                Some(rows) => {
                    self.data = rows;
                    Assign::Done
                }
                None => Assign::Rejected,
            },
            "font_size" => assign_f32(&mut self.font_size, value),
            "show_header" => assign_bool(&mut self.show_header, value),
            "theme" => assign_enum(&mut self.theme, value),
            "stroke_color" => assign_text(&mut self.stroke_color, value),
            "header_bg_color" => {
                self.header_bg_color = Some(value_to_text(value));
                Assign::Done
            }
            _ => Assign::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_round_trips_through_wire_shape() {
        let json = json!({
            "id": "t1",
            "kind": "table",
            "x": 10, "y": 20, "width": 100, "height": 30,
            "props": {"data": [["a", 1], ["b", 2.5]], "theme": "Striped", "custom": 7},
            "bindings": [{"variableName": "rows", "targetProperty": "data"}]
        });
        let e: Element = serde_json::from_value(json).unwrap();
        assert_eq!(e.kind(), ElementKind::Table);
        let ElementProps::Table(t) = &e.props else {
            panic!("expected table props");
        };
        assert_eq!(t.data, vec![vec!["a", "1"], vec!["b", "2.5"]]);
        assert_eq!(t.theme, TableTheme::Striped);
        assert_eq!(t.extra.get("custom"), Some(&json!(7)));
        assert_eq!(e.bindings[0].variable_name, "rows");

        let back = serde_json::to_value(&e).unwrap();
        assert_eq!(back["kind"], "table");
        assert_eq!(back["props"]["custom"], 7);
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let json = json!({
            "type": "text",
            "props": {"text": "hi"},
            "bindings": [{"variable_name": "v", "target_property": "text"}]
        });
        let e: Element = serde_json::from_value(json).unwrap();
        assert_eq!(e.kind(), ElementKind::Text);
        assert!(!e.id.is_empty(), "missing ids are generated");
        assert_eq!(e.bindings[0].target_property, "text");
    }

    #[test]
    fn template_items_distinguish_elements_and_instances() {
        let json = json!({
            "name": "t",
            "pageSize": {"width": 210, "height": 297},
            "items": [
                {"kind": "rect", "x": 1, "y": 2},
                {"blockId": "hdr", "x": 0, "y": 0, "data": {"name": "ACME"}}
            ]
        });
        let t: Template = serde_json::from_value(json).unwrap();
        assert!(matches!(t.items[0], TemplateItem::Element(_)));
        match &t.items[1] {
            TemplateItem::Instance(i) => {
                assert_eq!(i.block_id, "hdr");
                assert_eq!(i.data["name"], "ACME");
            }
            other => panic!("expected instance, got {other:?}"),
        }
    }

    #[test]
    fn set_coerces_typed_fields_and_keeps_unknown_names() {
        let mut props = ElementProps::text("x");
        props.set("font_size", &json!("14"));
        props.set("font_bold", &json!(true));
        props.set("tooltip", &json!("hover"));
        let ElementProps::Text(t) = &props else {
            panic!("expected text");
        };
        assert_eq!(t.font_size, 14.0);
        assert!(t.font_bold);
        assert_eq!(props.extra_value("tooltip"), Some(&json!("hover")));
    }

    #[test]
    fn rejected_values_leave_fields_unchanged() {
        let mut props = ElementProps::text("x");
        props.set("font_size", &json!("large"));
        let ElementProps::Text(t) = &props else {
            panic!("expected text");
        };
        assert_eq!(t.font_size, 12.0);
    }

    #[test]
    fn table_data_accepts_flat_row() {
        assert_eq!(
            value_to_rows(&json!(["a", "b"])),
            Some(vec![vec!["a".to_string(), "b".to_string()]])
        );
        assert_eq!(value_to_rows(&json!("nope")), None);
    }

    #[test]
    fn unit_conversion() {
        assert!((mm_to_pt(10.0) - 28.3465).abs() < 1e-4);
        assert!((pt_to_mm(mm_to_pt(42.0)) - 42.0).abs() < 1e-4);
    }
}

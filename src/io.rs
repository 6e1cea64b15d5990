//! Persisted format: loading, saving, migrating and validating templates,
//! blocks and variable maps.
//!
//! Validation happens here and only here. Once a [`Template`] has been
//! loaded, the rest of the pipeline treats whatever it finds as soft
//! failures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ForgeError;
use crate::layout::MAX_NESTING_DEPTH;
use crate::model::{Block, Element, Template, TemplateItem, Variables, CURRENT_VERSION};

/// Versions written before elements could be nested.
const FLAT_VERSIONS: [&str; 2] = ["0.0.0", "0.0.1"];

/// Load a template from a JSON file, migrating and validating it.
pub fn load_template(path: impl AsRef<Path>) -> Result<Template, ForgeError> {
    let json = fs::read_to_string(path)?;
    template_from_json(&json)
}

/// Parse, migrate and validate a template.
pub fn template_from_json(json: &str) -> Result<Template, ForgeError> {
    let mut value: Value = serde_json::from_str(json)?;
    migrate(&mut value);
    let template: Template = serde_json::from_value(value)?;
    validate_template(&template)?;
    log::debug!(
        "loaded template '{}' (v{}) with {} item(s)",
        template.name,
        template.version,
        template.items.len()
    );
    Ok(template)
}

/// Write `template` as pretty JSON, stamped with the current format version.
pub fn save_template(template: &Template, path: impl AsRef<Path>) -> Result<(), ForgeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut stamped = template.clone();
    stamped.version = CURRENT_VERSION.to_string();
    fs::write(path, serde_json::to_string_pretty(&stamped)?)?;
    Ok(())
}

/// Load block definitions keyed by id. The file holds either one block or an
/// array of blocks.
pub fn load_blocks(path: impl AsRef<Path>) -> Result<BTreeMap<String, Block>, ForgeError> {
    let json = fs::read_to_string(path)?;
    blocks_from_json(&json)
}

pub fn blocks_from_json(json: &str) -> Result<BTreeMap<String, Block>, ForgeError> {
    let value: Value = serde_json::from_str(json)?;
    let blocks: Vec<Block> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };

    let mut by_id = BTreeMap::new();
    for block in blocks {
        validate_elements(&block.elements)?;
        by_id.insert(block.id.clone(), block);
    }
    Ok(by_id)
}

/// Load a global variable map from a JSON object.
pub fn load_variables(path: impl AsRef<Path>) -> Result<Variables, ForgeError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Bump an `x.y.z` version, rolling each digit over at 9:
/// `0.0.9` → `0.1.0`, `0.9.9` → `1.0.0`. Anything else becomes `0.0.1`.
pub fn increment_version(version: &str) -> String {
    let parts: Vec<u32> = match version.split('.').map(str::parse).collect() {
        Ok(parts) => parts,
        Err(_) => return "0.0.1".to_string(),
    };
    let &[mut major, mut minor, mut patch] = parts.as_slice() else {
        return "0.0.1".to_string();
    };

    patch += 1;
    if patch > 9 {
        patch = 0;
        minor += 1;
        if minor > 9 {
            minor = 0;
            major += 1;
        }
    }
    format!("{major}.{minor}.{patch}")
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Bring a raw template document up to [`CURRENT_VERSION`].
fn migrate(value: &mut Value) {
    let Some(doc) = value.as_object_mut() else {
        return;
    };
    let version = doc
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("0.0.0")
        .to_string();

    if FLAT_VERSIONS.contains(&version.as_str()) {
        if let Some(Value::Array(items)) = doc.remove("items") {
            doc.insert("items".into(), Value::Array(nest_flat_items(items)));
        }
        doc.insert("version".into(), Value::String(CURRENT_VERSION.to_string()));
        log::info!("migrated template from v{version} to v{CURRENT_VERSION}");
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Bounds {
    fn of(item: &Value) -> Self {
        let num = |key: &str| item.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        Self {
            x: num("x"),
            y: num("y"),
            w: num("width"),
            h: num("height"),
        }
    }

    fn area(&self) -> f64 {
        self.w * self.h
    }

    fn contains(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.w <= self.x + self.w
            && other.y + other.h <= self.y + self.h
    }
}

fn item_kind(item: &Value) -> Option<&str> {
    item.get("kind")
        .or_else(|| item.get("type"))
        .and_then(Value::as_str)
}

fn is_instance(item: &Value) -> bool {
    item.get("blockId").is_some() || item.get("block_id").is_some()
}

/// Nest a flat item list: every element goes into the smallest container
/// that completely contains it, then containers go into the smallest
/// strictly larger container (or an equal-sized one later in area order).
/// Nested coordinates are rebased onto the new parent.
fn nest_flat_items(items: Vec<Value>) -> Vec<Value> {
    let bounds: Vec<Bounds> = items.iter().map(Bounds::of).collect();

    let mut containers: Vec<usize> = (0..items.len())
        .filter(|&i| !is_instance(&items[i]) && item_kind(&items[i]) == Some("container"))
        .collect();
    if containers.is_empty() {
        return items;
    }
    containers.sort_by(|&a, &b| bounds[a].area().total_cmp(&bounds[b].area()));

    let mut parent: Vec<Option<usize>> = vec![None; items.len()];
    // Children per container, in attachment order.
    let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();

    for i in 0..items.len() {
        if is_instance(&items[i]) || containers.contains(&i) {
            continue;
        }
        if let Some(&c) = containers.iter().find(|&&c| bounds[c].contains(&bounds[i])) {
            parent[i] = Some(c);
            children.entry(c).or_default().push(i);
        }
    }

    for (pos, &c) in containers.iter().enumerate() {
        let inner = bounds[c];
        let host = containers.iter().enumerate().find(|&(other_pos, &o)| {
            let outer = bounds[o];
            other_pos != pos
                && outer.contains(&inner)
                && (outer.area() > inner.area() || (outer.area() == inner.area() && other_pos > pos))
        });
        if let Some((_, &o)) = host {
            parent[c] = Some(o);
            children.entry(o).or_default().push(c);
        }
    }

    let mut slots: Vec<Option<Value>> = items.into_iter().map(Some).collect();
    let roots_first: Vec<usize> = containers
        .iter()
        .copied()
        .filter(|&c| parent[c].is_none())
        .chain((0..slots.len()).filter(|&i| !containers.contains(&i) && parent[i].is_none()))
        .collect();

    roots_first
        .into_iter()
        .filter_map(|i| build_subtree(i, &mut slots, &children, &bounds))
        .collect()
}

/// Move item `index` out of `slots`, attaching its assigned children
/// (recursively) with coordinates relative to it.
fn build_subtree(
    index: usize,
    slots: &mut [Option<Value>],
    children: &BTreeMap<usize, Vec<usize>>,
    bounds: &[Bounds],
) -> Option<Value> {
    let mut item = slots.get_mut(index)?.take()?;
    let Some(assigned) = children.get(&index) else {
        return Some(item);
    };

    let origin = bounds[index];
    let mut nested = Vec::with_capacity(assigned.len());
    for &child in assigned {
        if let Some(mut value) = build_subtree(child, slots, children, bounds) {
            if let Some(obj) = value.as_object_mut() {
                rebase(obj, &bounds[child], &origin);
            }
            nested.push(value);
        }
    }

    if let Some(obj) = item.as_object_mut() {
        match obj.get_mut("children") {
            Some(Value::Array(existing)) => existing.extend(nested),
            _ => {
                obj.insert("children".into(), Value::Array(nested));
            }
        }
    }
    Some(item)
}

fn rebase(obj: &mut Map<String, Value>, own: &Bounds, origin: &Bounds) {
    obj.insert("x".into(), Value::from(own.x - origin.x));
    obj.insert("y".into(), Value::from(own.y - origin.y));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject geometry and structure the pipeline cannot interpret.
pub fn validate_template(template: &Template) -> Result<(), ForgeError> {
    if template.page_size.width < 0.0 || template.page_size.height < 0.0 {
        return Err(ForgeError::InvalidTemplate(format!(
            "negative page size {}x{}",
            template.page_size.width, template.page_size.height
        )));
    }
    let top_margin = template.settings.page_top_margin_mm;
    if !top_margin.is_finite() || top_margin < 0.0 {
        return Err(ForgeError::InvalidTemplate(format!(
            "page top margin {top_margin}mm must be a non-negative number"
        )));
    }
    let roots: Vec<&Element> = template
        .items
        .iter()
        .filter_map(|item| match item {
            TemplateItem::Element(e) => Some(e),
            TemplateItem::Instance(_) => None,
        })
        .collect();
    validate_roots(&roots)
}

pub fn validate_elements(elements: &[Element]) -> Result<(), ForgeError> {
    let roots: Vec<&Element> = elements.iter().collect();
    validate_roots(&roots)
}

fn validate_roots(roots: &[&Element]) -> Result<(), ForgeError> {
    for root in roots {
        validate_tree(root, &mut Vec::new(), 0)?;
    }
    Ok(())
}

fn validate_tree<'a>(
    element: &'a Element,
    ancestors: &mut Vec<&'a str>,
    depth: usize,
) -> Result<(), ForgeError> {
    if element.width < 0.0 || element.height < 0.0 {
        return Err(ForgeError::InvalidTemplate(format!(
            "element '{}' has negative size {}x{}",
            element.id, element.width, element.height
        )));
    }
    if depth > MAX_NESTING_DEPTH {
        return Err(ForgeError::InvalidTemplate(format!(
            "element '{}' is nested {depth} levels deep (max {MAX_NESTING_DEPTH})",
            element.id
        )));
    }
    if ancestors.contains(&element.id.as_str()) {
        return Err(ForgeError::InvalidTemplate(format!(
            "element id '{}' repeats one of its ancestors",
            element.id
        )));
    }

    ancestors.push(&element.id);
    for child in &element.children {
        validate_tree(child, ancestors, depth + 1)?;
    }
    ancestors.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::ElementProps;

    fn element<'a>(template: &'a Template, index: usize) -> &'a Element {
        match &template.items[index] {
            TemplateItem::Element(e) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn version_rolls_over_each_digit() {
        assert_eq!(increment_version("0.0.1"), "0.0.2");
        assert_eq!(increment_version("0.0.9"), "0.1.0");
        assert_eq!(increment_version("0.9.9"), "1.0.0");
        assert_eq!(increment_version("1.2"), "0.0.1");
        assert_eq!(increment_version("a.b.c"), "0.0.1");
    }

    #[test]
    fn flat_template_nests_into_smallest_container() {
        let doc = json!({
            "version": "0.0.1",
            "pageSize": {"width": 210, "height": 297},
            "items": [
                {"id": "outer", "type": "container", "x": 0, "y": 0, "width": 200, "height": 200, "props": {}},
                {"id": "inner", "type": "container", "x": 10, "y": 10, "width": 50, "height": 50, "props": {}},
                {"id": "label", "type": "text", "x": 15, "y": 20, "width": 20, "height": 5, "props": {"text": "hi"}},
                {"id": "loose", "type": "rect", "x": 150, "y": 250, "width": 10, "height": 10, "props": {}},
                {"blockId": "hdr", "x": 0, "y": 0}
            ]
        });
        let template = template_from_json(&doc.to_string()).unwrap();
        assert_eq!(template.version, CURRENT_VERSION);
        assert_eq!(template.items.len(), 3, "outer, loose and the instance stay on top");

        let outer = element(&template, 0);
        assert_eq!(outer.id, "outer");
        let inner = &outer.children[0];
        assert_eq!(inner.id, "inner");
        assert_eq!((inner.x, inner.y), (10.0, 10.0));
        let label = &inner.children[0];
        assert_eq!(label.id, "label");
        assert_eq!((label.x, label.y), (5.0, 10.0));

        assert_eq!(element(&template, 1).id, "loose");
        assert!(matches!(template.items[2], TemplateItem::Instance(_)));
    }

    #[test]
    fn current_version_is_not_migrated() {
        let doc = json!({
            "version": "0.0.2",
            "pageSize": {"width": 210, "height": 297},
            "items": [
                {"id": "box", "kind": "container", "x": 0, "y": 0, "width": 100, "height": 100, "props": {}},
                {"id": "r", "kind": "rect", "x": 10, "y": 10, "width": 5, "height": 5, "props": {}}
            ]
        });
        let template = template_from_json(&doc.to_string()).unwrap();
        assert_eq!(template.items.len(), 2);
    }

    #[test]
    fn validation_rejects_bad_geometry_and_cycles() {
        let negative = json!({
            "version": "0.0.2",
            "pageSize": {"width": 210, "height": 297},
            "items": [{"id": "r", "kind": "rect", "width": -1, "height": 5, "props": {}}]
        });
        assert!(matches!(
            template_from_json(&negative.to_string()),
            Err(ForgeError::InvalidTemplate(_))
        ));

        let looped = Element::new("a", ElementProps::container())
            .with_child(Element::new("b", ElementProps::container()).with_child(Element::new("a", ElementProps::rect())));
        assert!(matches!(validate_elements(&[looped]), Err(ForgeError::InvalidTemplate(_))));

        let mut deep = Element::new("leaf", ElementProps::rect());
        for level in 0..=MAX_NESTING_DEPTH {
            deep = Element::new(format!("c{level}"), ElementProps::container()).with_child(deep);
        }
        assert!(matches!(validate_elements(&[deep]), Err(ForgeError::InvalidTemplate(_))));
    }

    #[test]
    fn validation_rejects_negative_top_margin() {
        let doc = json!({
            "version": "0.0.2",
            "pageSize": {"width": 210, "height": 100},
            "settings": {"pageTopMarginMm": -10},
            "items": [{"id": "r", "kind": "rect", "y": 90, "width": 20, "height": 20, "props": {}}]
        });
        assert!(matches!(
            template_from_json(&doc.to_string()),
            Err(ForgeError::InvalidTemplate(_))
        ));

        let template = Template::new("margins", crate::model::PageSize::a4()).with_top_margin(f32::NAN);
        assert!(matches!(validate_template(&template), Err(ForgeError::InvalidTemplate(_))));
        let template = Template::new("margins", crate::model::PageSize::a4()).with_top_margin(12.0);
        assert!(validate_template(&template).is_ok());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(template_from_json("{not json"), Err(ForgeError::Json(_))));
    }

    #[test]
    fn blocks_load_from_array_or_single_object() {
        let single = blocks_from_json(r#"{"id": "hdr", "elements": []}"#).unwrap();
        assert!(single.contains_key("hdr"));

        let many = blocks_from_json(r#"[{"id": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(many.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn save_stamps_current_version_and_reloads() {
        let dir = std::env::temp_dir().join(format!("plate-forge-io-{}", std::process::id()));
        let path = dir.join("template.json");

        let mut template = Template::new("saved", crate::model::PageSize::a4())
            .with_item(Element::new("t", ElementProps::text("hello")).sized(10.0, 5.0));
        template.version = "0.0.1".into();
        save_template(&template, &path).unwrap();

        let back = load_template(&path).unwrap();
        assert_eq!(back.version, CURRENT_VERSION);
        assert_eq!(back.items, template.items);
        let _ = fs::remove_dir_all(dir);
    }
}

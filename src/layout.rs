//! Layout resolver – flattens the template's element/block hierarchy into a
//! single ordered list of absolutely positioned, binding-resolved elements.
//!
//! Emission order is pre-order (a parent before its children, children in
//! authored order), which is also the paint order used by the renderer.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Warning;
use crate::model::{
    value_to_text, Binding, BlockLookup, Element, ElementKind, ElementProps, Template,
    TemplateItem, Variables,
};

/// Deepest child level the resolver descends to below a top-level element.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A flattened element: absolute page-space millimetres, no children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
}

impl PositionedElement {
    /// Copy `element` without its children, placed at the absolute position
    /// (`abs_x`, `abs_y`).
    pub fn from_element(element: &Element, abs_x: f32, abs_y: f32) -> Self {
        let mut positioned = Self {
            id: element.id.clone(),
            name: element.name.clone(),
            x: element.x,
            y: element.y,
            width: element.width,
            height: element.height,
            props: element.props.clone(),
            bindings: element.bindings.clone(),
        };
        positioned.translate(abs_x - element.x, abs_y - element.y);
        positioned
    }

    pub fn kind(&self) -> ElementKind {
        self.props.kind()
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Move the element, carrying a line's end point along with it.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
        if let ElementProps::Line(line) = &mut self.props {
            if let Some(x2) = line.x2.as_mut() {
                *x2 += dx;
            }
            if let Some(y2) = line.y2.as_mut() {
                *y2 += dy;
            }
        }
    }

    /// End point of a line element; the far box corner when not authored.
    pub fn line_end(&self) -> (f32, f32) {
        match &self.props {
            ElementProps::Line(line) => (
                line.x2.unwrap_or(self.x + self.width),
                line.y2.unwrap_or(self.y + self.height),
            ),
            _ => (self.x + self.width, self.y + self.height),
        }
    }

    pub fn set_property(&mut self, name: &str, value: &Value) {
        self.props.set(name, value);
    }
}

/// Output of the resolver.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub elements: Vec<PositionedElement>,
    pub warnings: Vec<Warning>,
}

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").ok())
        .as_ref()
}

/// Replace `{{ identifier }}` placeholders with values from `data`.
/// Identifiers missing from `data` are left verbatim, braces included.
pub fn substitute_placeholders(text: &str, data: &Variables) -> String {
    let Some(re) = placeholder_regex() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures| match data.get(&caps[1]) {
        Some(value) => value_to_text(value),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Flatten one element tree in pre-order. `offset_x`/`offset_y` is the
/// absolute position the element's own coordinates are relative to.
///
/// Children below `max_depth` levels are dropped with a
/// [`Warning::DepthLimit`].
pub fn flatten_tree(element: &Element, offset_x: f32, offset_y: f32, max_depth: usize) -> Resolved {
    let mut out = Resolved::default();
    let mut stack = vec![(element, offset_x, offset_y, 0usize)];

    while let Some((node, ox, oy, depth)) = stack.pop() {
        let abs_x = ox + node.x;
        let abs_y = oy + node.y;
        out.elements.push(PositionedElement::from_element(node, abs_x, abs_y));

        if node.children.is_empty() {
            continue;
        }
        if depth >= max_depth {
            let warning = Warning::DepthLimit {
                element_id: node.id.clone(),
                depth: depth + 1,
            };
            warning.log();
            out.warnings.push(warning);
            continue;
        }
        // Reverse so the first child is popped first.
        for child in node.children.iter().rev() {
            stack.push((child, abs_x, abs_y, depth + 1));
        }
    }
    out
}

/// Overwrite bound properties from the global variable map. Bindings whose
/// variable is absent leave the property untouched.
pub fn apply_global_bindings(elements: &mut [PositionedElement], variables: &Variables) {
    for element in elements.iter_mut() {
        for binding in &element.bindings {
            if let Some(value) = variables.get(&binding.variable_name) {
                element.props.set(&binding.target_property, value);
            }
        }
    }
}

/// Resolve a template into a flat, absolute, binding-applied element list.
pub fn resolve(template: &Template, blocks: &dyn BlockLookup, variables: &Variables) -> Resolved {
    resolve_with_depth(template, blocks, variables, MAX_NESTING_DEPTH)
}

pub fn resolve_with_depth(
    template: &Template,
    blocks: &dyn BlockLookup,
    variables: &Variables,
    max_depth: usize,
) -> Resolved {
    let mut resolved = Resolved::default();

    for item in &template.items {
        match item {
            TemplateItem::Element(element) => {
                let flat = flatten_tree(element, 0.0, 0.0, max_depth);
                resolved.elements.extend(flat.elements);
                resolved.warnings.extend(flat.warnings);
            }
            TemplateItem::Instance(instance) => {
                let Some(block) = blocks.block(&instance.block_id) else {
                    let warning = Warning::MissingBlock {
                        instance_id: instance.id.clone(),
                        block_id: instance.block_id.clone(),
                    };
                    warning.log();
                    resolved.warnings.push(warning);
                    continue;
                };
                for element in &block.elements {
                    let mut flat = flatten_tree(element, instance.x, instance.y, max_depth);
                    for e in &mut flat.elements {
                        if let ElementProps::Text(text) = &mut e.props {
                            text.text = substitute_placeholders(&text.text, &instance.data);
                        }
                    }
                    resolved.elements.extend(flat.elements);
                    resolved.warnings.extend(flat.warnings);
                }
            }
        }
    }

    apply_global_bindings(&mut resolved.elements, variables);

    log::debug!(
        "resolved {} top-level items into {} elements",
        template.items.len(),
        resolved.elements.len()
    );
    resolved
}

use html5ever::interface::Attribute;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, TreeSink};
use html5ever::{namespace_url, ns, parse_document, LocalName, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

pub fn html_to_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

pub fn serialize_dom(dom: &RcDom) -> std::io::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &document, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Every element under `node`, in document order.
///
/// Collected up front so later mutations (replacing a `<link>` with a
/// `<style>`) do not change what gets visited.
pub fn collect_elements(node: &Handle) -> Vec<Handle> {
    let mut elements = Vec::new();
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        if let NodeData::Element { .. } = current.data {
            elements.push(current.clone());
        }
        for child in current.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }
    elements
}

pub fn get_node_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn has_node_attr(node: &Handle, attr_name: &str) -> bool {
    get_node_attr(node, attr_name).is_some()
}

/// Set or (with `None`) remove an attribute.
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        let attrs = &mut attrs.borrow_mut();
        let position = attrs.iter().position(|attr| &*attr.name.local == attr_name);
        match (position, attr_value) {
            (Some(i), Some(value)) => attrs[i].value = StrTendril::from(value),
            (Some(i), None) => {
                attrs.remove(i);
            }
            (None, Some(value)) => attrs.push(new_attribute(attr_name, &value)),
            (None, None) => {}
        }
    }
}

/// All attributes as (name, value) pairs, in source order.
pub fn node_attrs(node: &Handle) -> Vec<(String, String)> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Concatenated text of the node's direct text children.
pub fn get_text(node: &Handle) -> String {
    node.children
        .borrow()
        .iter()
        .filter_map(|child| match child.data {
            NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
            _ => None,
        })
        .collect()
}

/// Replace all children of `node` with a single text node.
pub fn set_text(node: &Handle, text: &str) {
    let mut sink = RcDom::default();
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in &children {
        sink.remove_from_parent(child);
    }
    sink.append(node, NodeOrText::AppendText(StrTendril::from_slice(text)));
}

/// A detached HTML element with the given attributes.
pub fn create_element(name: &str, attrs: &[(String, String)]) -> Handle {
    let mut sink = RcDom::default();
    sink.create_element(
        QualName::new(None, ns!(html), LocalName::from(name)),
        attrs
            .iter()
            .map(|(name, value)| new_attribute(name, value))
            .collect(),
        ElementFlags::default(),
    )
}

/// Put `replacement` where `target` was.
pub fn replace_node(target: &Handle, replacement: &Handle) {
    let mut sink = RcDom::default();
    sink.append_before_sibling(target, NodeOrText::AppendNode(replacement.clone()));
    sink.remove_from_parent(target);
}

pub fn remove_node(target: &Handle) {
    RcDom::default().remove_from_parent(target);
}

fn new_attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(dom: &RcDom, name: &str) -> Handle {
        collect_elements(&dom.document)
            .into_iter()
            .find(|node| get_node_name(node).as_deref() == Some(name))
            .unwrap()
    }

    #[test]
    fn test_elements_in_document_order() {
        let dom = html_to_dom("<html><head><title>t</title></head><body><p><a>x</a></p><img></body></html>");
        let names: Vec<String> = collect_elements(&dom.document)
            .iter()
            .filter_map(get_node_name)
            .collect();
        assert_eq!(names, ["html", "head", "title", "body", "p", "a", "img"]);
    }

    #[test]
    fn test_node_name_is_lowercase_string() {
        let frame = create_element("IFRAME", &[]);
        assert_eq!(get_node_name(&frame), Some("iframe".to_string()));
        assert_eq!(get_node_name(&html_to_dom("").document), None);
    }

    #[test]
    fn test_attribute_roundtrip() {
        let dom = html_to_dom(r#"<img src="a.png" alt="x">"#);
        let img = first(&dom, "img");
        set_node_attr(&img, "data-src", Some("a.png".into()));
        set_node_attr(&img, "src", Some("b.png".into()));
        set_node_attr(&img, "alt", None);
        assert_eq!(get_node_attr(&img, "src").as_deref(), Some("b.png"));
        assert_eq!(get_node_attr(&img, "data-src").as_deref(), Some("a.png"));
        assert!(!has_node_attr(&img, "alt"));
    }

    #[test]
    fn test_replace_link_with_style() {
        let dom = html_to_dom(r#"<html><head><link rel="stylesheet" href="s.css"></head></html>"#);
        let link = first(&dom, "link");
        let style = create_element("style", &[("type".into(), "text/css".into())]);
        set_text(&style, "body{color:red}");
        replace_node(&link, &style);

        let html = serialize_dom(&dom).unwrap();
        assert!(html.contains(r#"<style type="text/css">body{color:red}</style>"#));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn test_remove_and_text() {
        let dom = html_to_dom("<html><head><script>var a = 1;</script><style>p{}</style></head></html>");
        let style = first(&dom, "style");
        assert_eq!(get_text(&style), "p{}");
        remove_node(&first(&dom, "script"));
        assert!(!serialize_dom(&dom).unwrap().contains("script"));
    }
}

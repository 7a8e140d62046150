//! Host handles: DOM nodes and events seen from expressions.

use tendril_dom::{Event, Node};
use tendril_reactive::{HostRef, Object, Value};

/// Wrap a node; handles for the same node compare equal
pub fn node_value(node: &Node) -> Value {
	Value::Host(HostRef::with_identity(node.clone(), node.identity()))
}

pub fn event_value(event: &Event) -> Value {
	Value::Host(HostRef::new(event.clone()))
}

pub fn as_node(value: &Value) -> Option<Node> {
	value.as_host()?.downcast_ref::<Node>().cloned()
}

pub fn as_event(value: &Value) -> Option<Event> {
	value.as_host()?.downcast_ref::<Event>().cloned()
}

pub(crate) fn get(host: &HostRef, name: &str) -> Option<Value> {
	if let Some(node) = host.downcast_ref::<Node>() {
		return node_property(node, name);
	}
	let event = host.downcast_ref::<Event>()?;
	Some(match name {
		"type" => Value::str(event.event_type()),
		"target" => event.target().map(|n| node_value(&n)).unwrap_or(Value::Null),
		"currentTarget" => event
			.current_target()
			.map(|n| node_value(&n))
			.unwrap_or(Value::Null),
		"detail" => Value::from_json(event.detail().clone()),
		"defaultPrevented" => Value::Bool(event.default_prevented()),
		"bubbles" => Value::Bool(event.bubbles()),
		_ => return None,
	})
}

fn node_property(node: &Node, name: &str) -> Option<Value> {
	Some(match name {
		"value" => Value::from(node.value()),
		"checked" => Value::Bool(node.checked()),
		"textContent" => Value::from(node.text_content()),
		"innerHTML" => Value::from(node.inner_html()),
		"outerHTML" => Value::from(node.outer_html()),
		"tagName" => Value::from(node.tag_name()),
		"className" => Value::from(node.get_attribute("class").unwrap_or_default()),
		"isConnected" => Value::Bool(node.is_connected()),
		"parentNode" | "parentElement" => node.parent().map(|p| node_value(&p)).unwrap_or(Value::Null),
		"children" => Value::Object(Object::new_array(
			node.element_children().iter().map(node_value).collect(),
		)),
		_ => Value::from_json(node.property(name)?),
	})
}

pub(crate) fn set(host: &HostRef, name: &str, value: &Value) -> bool {
	let Some(node) = host.downcast_ref::<Node>() else {
		return false;
	};
	match name {
		"textContent" => node.set_text_content(&value.to_display_string()),
		"innerHTML" => {
			if let Err(err) = node.set_inner_html(&value.to_display_string()) {
				crate::warn_log!(error = %err, "innerHTML assignment rejected");
			}
		}
		"className" => node.set_attribute("class", &value.to_js_string()),
		"id" => node.set_attribute("id", &value.to_js_string()),
		_ => node.set_property(name, value.to_json()),
	}
	true
}

pub(crate) fn call(host: &HostRef, name: &str, args: &[Value]) -> Option<Value> {
	let arg = |i: usize| args.get(i).map(Value::to_js_string).unwrap_or_default();
	if let Some(event) = host.downcast_ref::<Event>() {
		match name {
			"preventDefault" => event.prevent_default(),
			"stopPropagation" => event.stop_propagation(),
			_ => return None,
		}
		return Some(Value::Undefined);
	}
	let node = host.downcast_ref::<Node>()?;
	Some(match name {
		"click" => Value::Bool(node.click()),
		"focus" | "blur" => Value::Undefined,
		"getAttribute" => node.get_attribute(&arg(0)).map(Value::from).unwrap_or(Value::Null),
		"hasAttribute" => Value::Bool(node.has_attribute(&arg(0))),
		"setAttribute" => {
			node.set_attribute(&arg(0), &arg(1));
			Value::Undefined
		}
		"removeAttribute" => {
			node.remove_attribute(&arg(0));
			Value::Undefined
		}
		"dispatchEvent" => {
			let event = args.first().and_then(as_event)?;
			Value::Bool(node.dispatch_event(&event))
		}
		"querySelector" => node
			.query_selector(&arg(0))
			.ok()
			.flatten()
			.map(|n| node_value(&n))
			.unwrap_or(Value::Null),
		"closest" => node
			.closest(&arg(0))
			.ok()
			.flatten()
			.map(|n| node_value(&n))
			.unwrap_or(Value::Null),
		_ => return None,
	})
}

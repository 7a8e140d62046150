//! Component-scoped stylesheets.

use crate::context::AppState;
use crate::shared::camelize;

/// Class added to every rendered root of component `name`
pub fn scope_class(name: &str) -> String {
	format!("scope-{}", camelize(name))
}

/// Inject `css` for component `name` unless already present
///
/// Occurrences of `scope_token` become a selector for the component's
/// scope class. Returns whether a style element was added.
pub fn inject_component_style(app: &AppState, name: &str, css: &str) -> bool {
	let id = format!("style-{}", camelize(name));
	if app.has_style(&id) {
		return false;
	}
	let scoped = css.replace(&app.config().scope_token, &format!(".{}", scope_class(name)));
	app.inject_style(&id, &scoped)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use tendril_dom::Document;

	use crate::config::AppConfig;

	#[rstest]
	fn test_style_injected_once_with_scope_rewritten() {
		let app = AppState::new(Document::new(), AppConfig::default());

		assert!(inject_component_style(&app, "user-card", ".$scope h1 { color: red }"));
		assert!(!inject_component_style(&app, "user-card", ".$scope h1 { color: blue }"));

		let style = app.document().get_element_by_id("style-userCard").unwrap();
		assert_eq!(style.text_content(), ".scope-userCard h1 { color: red }");
		assert!(app.document().head().contains(&style));
	}

	#[rstest]
	fn test_clear_styles_removes_elements() {
		let app = AppState::new(Document::new(), AppConfig::default());
		inject_component_style(&app, "a", "p {}");
		app.clear_styles();
		assert!(app.document().get_element_by_id("style-a").is_none());
		assert!(!app.has_style("style-a"));
	}
}

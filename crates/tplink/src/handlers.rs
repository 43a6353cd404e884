//
// handlers.rs
//
// LSP request handlers for include links
//

use tower_lsp::lsp_types::*;

use crate::include_link::{Modifiers, PointerFeedback};
use crate::state::WorldState;

/// Tooltip for an active include link under `position`.
///
/// The client only asks for hover while its own hover gesture is in
/// progress, so the link is evaluated as if the navigation modifier were held.
pub fn hover(state: &WorldState, uri: &Url, position: Position) -> Option<Hover> {
    let session = state.registry.get(uri)?;
    let document = session.document();
    let offset = document.position_to_offset(position);
    let hit = session.active_link_at(offset)?;
    let tooltip = hit.target.display_path()?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("`{}`", tooltip),
        }),
        range: Some(document.range_of(hit.start, hit.end)),
    })
}

/// Location of the include target under `position`, as a navigation click
/// with the modifier held
pub fn goto_definition(
    state: &WorldState,
    uri: &Url,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    let session = state.registry.get(uri)?;
    let offset = session.document().position_to_offset(position);
    let modifiers = Modifiers::only(session.navigation_modifier());
    let request = session.pointer_clicked(offset, modifiers, 1)?;

    Some(GotoDefinitionResponse::Scalar(Location {
        uri: request.uri,
        range: Range::default(),
    }))
}

/// Links for every highlight currently rendered in the document
pub fn document_links(state: &WorldState, uri: &Url) -> Option<Vec<DocumentLink>> {
    let session = state.registry.get(uri)?;
    let document = session.document();

    let links = session
        .markup()
        .highlights()
        .into_iter()
        .map(|highlight| DocumentLink {
            range: document.range_of(highlight.start, highlight.end),
            target: Url::from_file_path(&highlight.tag.target).ok(),
            tooltip: Some(highlight.tag.target.display().to_string()),
            data: None,
        })
        .collect();

    Some(links)
}

/// Pointer moved with the given modifiers held
pub fn pointer_moved(
    state: &mut WorldState,
    uri: &Url,
    position: Position,
    modifiers: Modifiers,
) -> Option<PointerFeedback> {
    let session = state.registry.get_mut(uri)?;
    let offset = session.document().position_to_offset(position);
    session.pointer_moved(offset, modifiers)
}

/// Pointer clicked; returns the include target to open
pub fn pointer_clicked(
    state: &WorldState,
    uri: &Url,
    position: Position,
    modifiers: Modifiers,
    click_count: u32,
) -> Option<Location> {
    let session = state.registry.get(uri)?;
    let offset = session.document().position_to_offset(position);
    let request = session.pointer_clicked(offset, modifiers, click_count)?;
    Some(Location {
        uri: request.uri,
        range: Range::default(),
    })
}

/// Key released; `modifiers` is the state after the release
pub fn key_released(
    state: &mut WorldState,
    uri: &Url,
    modifiers: Modifiers,
) -> Option<PointerFeedback> {
    state.registry.get_mut(uri)?.key_released(modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include_link::{Affordance, ModifierKey};
    use std::fs;
    use tempfile::TempDir;

    fn setup(text: &str) -> (TempDir, WorldState, Url) {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("foo.html"), "").unwrap();
        let uri = Url::from_file_path(temp.path().join("page.html")).unwrap();
        let mut state = WorldState::default();
        state.registry.open(uri.clone(), text, Some(1));
        (temp, state, uri)
    }

    #[test]
    fn test_hover_over_active_link() {
        let (temp, state, uri) = setup("<p>x</p>\n<!-- INCLUDE foo.html -->");
        let hover = hover(&state, &uri, Position::new(1, 15)).unwrap();
        let HoverContents::Markup(content) = hover.contents else {
            panic!("expected markup hover");
        };
        assert!(content
            .value
            .contains(&temp.path().join("foo.html").display().to_string()));
        assert_eq!(
            hover.range,
            Some(Range::new(Position::new(1, 13), Position::new(1, 21)))
        );

        assert!(super::hover(&state, &uri, Position::new(0, 1)).is_none());
    }

    #[test]
    fn test_no_hover_outside_comments() {
        let (_temp, state, uri) = setup("<p>INCLUDE foo.html</p>");
        assert!(hover(&state, &uri, Position::new(0, 12)).is_none());
        assert!(goto_definition(&state, &uri, Position::new(0, 12)).is_none());
        assert_eq!(document_links(&state, &uri).unwrap().len(), 0);
    }

    #[test]
    fn test_goto_definition_opens_target() {
        let (temp, state, uri) = setup("<!-- INCLUDE foo.html -->");
        let Some(GotoDefinitionResponse::Scalar(location)) =
            goto_definition(&state, &uri, Position::new(0, 14))
        else {
            panic!("expected a location");
        };
        assert_eq!(
            location.uri,
            Url::from_file_path(temp.path().join("foo.html")).unwrap()
        );
    }

    #[test]
    fn test_document_links_follow_rendering() {
        let (temp, state, uri) = setup("<!-- INCLUDE foo.html -->\n<!-- INCLUDE gone.html -->");
        let links = document_links(&state, &uri).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].range,
            Range::new(Position::new(0, 13), Position::new(0, 21))
        );
        assert_eq!(
            links[0].target,
            Some(Url::from_file_path(temp.path().join("foo.html")).unwrap())
        );
    }

    #[test]
    fn test_unknown_document() {
        let state = WorldState::default();
        let uri = Url::parse("file:///nowhere/page.html").unwrap();
        assert!(hover(&state, &uri, Position::new(0, 0)).is_none());
        assert!(document_links(&state, &uri).is_none());
    }

    #[test]
    fn test_pointer_and_key_events() {
        let (_temp, mut state, uri) = setup("<!-- INCLUDE foo.html -->");
        let ctrl = Modifiers::only(ModifierKey::Ctrl);

        let feedback = pointer_moved(&mut state, &uri, Position::new(0, 15), ctrl).unwrap();
        assert_eq!(feedback.affordance, Affordance::Pointer);
        assert!(pointer_clicked(&state, &uri, Position::new(0, 15), ctrl, 1).is_some());
        assert!(pointer_clicked(&state, &uri, Position::new(0, 15), ctrl, 2).is_none());

        let restored = key_released(&mut state, &uri, Modifiers::default()).unwrap();
        assert_eq!(restored.affordance, Affordance::Text);
        assert!(restored.tooltip.is_none());
    }
}

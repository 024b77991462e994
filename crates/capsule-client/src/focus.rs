//! Presentation-only state: current view, side menu, expanded presence
//! card and lightbox selection.  Owned by whoever renders; nothing in the
//! sync layer reads it.

use capsule_shared::models::Image;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Home,
    Voicemails,
    Gallery,
}

impl View {
    pub const ALL: [View; 3] = [View::Home, View::Voicemails, View::Gallery];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Voicemails => "Voicemails",
            Self::Gallery => "Gallery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s.trim()))
    }
}

/// Which presence card is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Card {
    Me,
    Partner,
}

#[derive(Debug, Clone, Default)]
pub struct FocusState {
    view: View,
    menu_open: bool,
    expanded: Option<Card>,
    selected_image: Option<Image>,
}

impl FocusState {
    pub fn view(&self) -> View {
        self.view
    }

    /// Switch view.  Closes the menu.
    pub fn navigate(&mut self, view: View) {
        self.view = view;
        self.menu_open = false;
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    pub fn expanded(&self) -> Option<Card> {
        self.expanded
    }

    /// Expand `card`, or collapse it if it already is.  At most one card is
    /// expanded.
    pub fn toggle_card(&mut self, card: Card) {
        self.expanded = if self.expanded == Some(card) {
            None
        } else {
            Some(card)
        };
    }

    pub fn collapse_cards(&mut self) {
        self.expanded = None;
    }

    pub fn selected_image(&self) -> Option<&Image> {
        self.selected_image.as_ref()
    }

    pub fn select_image(&mut self, image: Image) {
        self.selected_image = Some(image);
    }

    pub fn close_lightbox(&mut self) {
        self.selected_image = None;
    }
}

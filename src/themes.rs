//! Built-in presentation themes and the theme picker rule.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const THEMES: &[Theme] = &[
    Theme {
        id: "zoo",
        label: "Zoo animals",
        icon: "🦁",
        description: "Lions, monkeys and elephants at the zoo",
    },
    Theme {
        id: "family",
        label: "My family",
        icon: "👨‍👩‍👧",
        description: "Mum, dad, brothers and sisters at home",
    },
    Theme {
        id: "school",
        label: "My school",
        icon: "🏫",
        description: "Classroom, teacher and friends",
    },
    Theme {
        id: "beach",
        label: "A day at the beach",
        icon: "🏖️",
        description: "Sand castles, waves and ice cream",
    },
    Theme {
        id: "park",
        label: "Playing in the park",
        icon: "🛝",
        description: "Slides, swings and kites",
    },
    Theme {
        id: "food",
        label: "My favourite food",
        icon: "🍕",
        description: "Fruit, vegetables and yummy snacks",
    },
    Theme {
        id: "space",
        label: "Space adventure",
        icon: "🚀",
        description: "Rockets, planets and astronauts",
    },
    Theme {
        id: "farm",
        label: "On the farm",
        icon: "🐄",
        description: "Cows, chickens and a red tractor",
    },
];

pub fn find_theme(id: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.id.eq_ignore_ascii_case(id.trim()))
}

/// Theme picker state. A catalog pick and typed text are mutually exclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeSelection {
    selected: Option<&'static Theme>,
    custom: String,
}

impl ThemeSelection {
    /// Pick a catalog theme, clearing any typed text.
    pub fn select(&mut self, theme: &'static Theme) {
        self.selected = Some(theme);
        self.custom.clear();
    }

    /// Type a custom theme, clearing any catalog pick.
    pub fn set_custom(&mut self, text: &str) {
        self.custom = text.to_string();
        self.selected = None;
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.custom.clear();
    }

    pub fn selected(&self) -> Option<&'static Theme> {
        self.selected
    }

    pub fn custom(&self) -> &str {
        &self.custom
    }

    /// The text sent to the providers, if exactly one source is set.
    pub fn theme_text(&self) -> Option<String> {
        let custom = self.custom.trim();
        match (self.selected, custom.is_empty()) {
            (Some(theme), true) => Some(theme.label.to_string()),
            (None, false) => Some(custom.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<&str> = THEMES.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), THEMES.len());
    }

    #[test]
    fn selecting_clears_custom_text() {
        let mut sel = ThemeSelection::default();
        sel.set_custom("Dinosaurs");
        sel.select(find_theme("zoo").unwrap());
        assert_eq!(sel.custom(), "");
        assert_eq!(sel.theme_text().as_deref(), Some("Zoo animals"));
    }

    #[test]
    fn typing_clears_catalog_pick() {
        let mut sel = ThemeSelection::default();
        sel.select(find_theme("farm").unwrap());
        sel.set_custom("  Dinosaurs ");
        assert!(sel.selected().is_none());
        assert_eq!(sel.theme_text().as_deref(), Some("Dinosaurs"));
    }

    #[test]
    fn blank_selection_has_no_theme() {
        let mut sel = ThemeSelection::default();
        assert!(sel.theme_text().is_none());
        sel.set_custom("   ");
        assert!(sel.theme_text().is_none());
    }
}

use crate::deep::Direction;

/// Kind of thing the unified encoder can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedType {
    Pedalboard,
    Preset,
    Plugin,
    Bypass,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selectable {
    Pedalboard,
    Preset,
    /// Index into the current pedalboard's plugin list.
    Plugin(usize),
    Bypass,
    System,
}

impl Selectable {
    pub fn kind(self) -> SelectedType {
        match self {
            Selectable::Pedalboard => SelectedType::Pedalboard,
            Selectable::Preset => SelectedType::Preset,
            Selectable::Plugin(_) => SelectedType::Plugin,
            Selectable::Bypass => SelectedType::Bypass,
            Selectable::System => SelectedType::System,
        }
    }
}

/// Result of moving the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub previous: SelectedType,
    pub current: Selectable,
}

impl Step {
    pub fn kind_changed(&self) -> bool {
        self.previous != self.current.kind()
    }
}

/// Ordered list of navigable targets with a wrapping cursor.
#[derive(Debug, Default)]
pub struct SelectionIndex {
    items: Vec<Selectable>,
    cursor: usize,
}

impl SelectionIndex {
    /// Recompute the list for a freshly current pedalboard and reset the cursor.
    pub fn rebuild(&mut self, plugin_count: usize, has_presets: bool, supports_toolbar: bool) {
        self.items.clear();
        self.items.push(Selectable::Pedalboard);
        if has_presets {
            self.items.push(Selectable::Preset);
        }
        self.items.extend((0..plugin_count).map(Selectable::Plugin));
        if supports_toolbar {
            self.items.push(Selectable::Bypass);
            self.items.push(Selectable::System);
        }
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn items(&self) -> &[Selectable] {
        &self.items
    }

    pub fn selected(&self) -> Option<Selectable> {
        self.items.get(self.cursor).copied()
    }

    /// Move the cursor one entry, wrapping at either end.
    pub fn advance(&mut self, direction: Direction) -> Option<Step> {
        let previous = self.selected()?.kind();
        let len = self.items.len();
        self.cursor = match direction {
            Direction::Forward => (self.cursor + 1) % len,
            Direction::Backward => (self.cursor + len - 1) % len,
        };
        Some(Step {
            previous,
            current: self.items[self.cursor],
        })
    }
}

use std::collections::BTreeMap;

use crate::deep::Direction;
use crate::session::Parameter;
use crate::system::WifiStatus;

/// Sort key of a menu row. Numbered rows come before named rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MenuKey {
    Index(usize),
    Name(String),
}

impl From<&str> for MenuKey {
    fn from(s: &str) -> Self {
        MenuKey::Name(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Back,
    Shutdown,
    Reboot,
    SystemInfo,
    SavePedalboard,
    Reload,
    RestartSoundEngine,
    InputGain,
    HeadphoneVolume,
    EnableHotspot,
    DisableHotspot,
    /// Open the value screen for the row's attached parameter.
    ShowValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub action: Option<MenuAction>,
    pub parameter: Option<Parameter>,
}

impl MenuItem {
    pub fn action(label: &str, action: MenuAction) -> Self {
        MenuItem {
            label: label.to_string(),
            action: Some(action),
            parameter: None,
        }
    }

    /// A row that shows information but cannot be picked.
    pub fn info(label: &str) -> Self {
        MenuItem {
            label: label.to_string(),
            action: None,
            parameter: None,
        }
    }

    pub fn parameter(param: Parameter) -> Self {
        MenuItem {
            label: param.name.clone(),
            action: Some(MenuAction::ShowValue),
            parameter: Some(param),
        }
    }
}

/// An ordered list of rows with a cursor that only stops on actionable rows.
#[derive(Debug, Default)]
pub struct Menu {
    pub title: String,
    items: BTreeMap<MenuKey, MenuItem>,
    cursor: usize,
}

impl Menu {
    pub fn new(title: &str, items: BTreeMap<MenuKey, MenuItem>) -> Self {
        Menu {
            title: title.to_string(),
            items,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, index: usize) {
        if index < self.items.len() {
            self.cursor = index;
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MenuKey, &MenuItem)> {
        self.items.iter()
    }

    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.values().nth(self.cursor)
    }

    /// Move to the next row having an action. Gives up after visiting every
    /// row once, leaving the cursor where that walk ended.
    pub fn advance(&mut self, direction: Direction) -> usize {
        let num = self.items.len();
        if num == 0 {
            return self.cursor;
        }
        let mut index = self.cursor;
        for _ in 0..num {
            index = match direction {
                Direction::Forward => (index + 1) % num,
                Direction::Backward => (index + num - 1) % num,
            };
            if self.items.values().nth(index).is_some_and(|i| i.action.is_some()) {
                break;
            }
        }
        self.cursor = index;
        index
    }

    /// Action at the cursor. Informational rows yield `None`.
    pub fn action(&self) -> Option<MenuAction> {
        self.selected().and_then(|i| i.action)
    }
}

pub fn system_menu() -> Menu {
    let rows = [
        ("< Back to main screen", MenuAction::Back),
        ("System shutdown", MenuAction::Shutdown),
        ("System reboot", MenuAction::Reboot),
        ("System info", MenuAction::SystemInfo),
        ("Save current pedalboard", MenuAction::SavePedalboard),
        ("Reload pedalboards", MenuAction::Reload),
        ("Restart sound engine", MenuAction::RestartSoundEngine),
        ("Input Gain", MenuAction::InputGain),
        ("Headphone Volume", MenuAction::HeadphoneVolume),
    ];
    let items = rows
        .into_iter()
        .enumerate()
        .map(|(i, (label, action))| (MenuKey::Index(i), MenuItem::action(label, action)))
        .collect();
    Menu::new("System menu", items)
}

pub fn system_info_menu(describe: Option<&str>, wifi: &WifiStatus) -> Menu {
    let mut items = BTreeMap::new();
    items.insert(MenuKey::Index(0), MenuItem::action("< Back to main screen", MenuAction::Back));
    items.insert("SW:".into(), MenuItem::info(describe.unwrap_or("unknown")));
    if let Some(active) = wifi.get("hotspot_active") {
        items.insert("hotspot_active".into(), MenuItem::info(active));
    }
    if let Some(ip) = wifi.get("ip_address") {
        items.insert("ip_addr".into(), MenuItem::info(ip));
    }
    if wifi.hotspot_active() {
        items.insert("Disable Hotspot".into(), MenuItem::action("", MenuAction::DisableHotspot));
    } else {
        items.insert("Enable Hotspot".into(), MenuItem::action("", MenuAction::EnableHotspot));
    }
    Menu::new("System Info", items)
}

/// Parameter pick-list for one plugin: a back row, then one row per parameter.
pub fn parameter_menu(instance_id: &str, params: &[Parameter]) -> Menu {
    let mut items = BTreeMap::new();
    items.insert(MenuKey::Index(0), MenuItem::action("< Back to main screen", MenuAction::Back));
    for (i, p) in params.iter().enumerate() {
        items.insert(MenuKey::Index(i + 1), MenuItem::parameter(p.clone()));
    }
    Menu::new(instance_id, items)
}

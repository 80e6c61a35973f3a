use std::collections::BTreeMap;
use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};

use view::{MenuList, MenuRow, PluginStrip, PluginTile, TitleBar, ValueGraph, centered_rect};

use super::{DisplaySink, Tool};
use crate::hardware::Footswitch;
use crate::menu::{Menu, MenuKey};
use crate::session::{AnalogAssignment, Parameter, Plugin};
use crate::system::WifiStatus;

struct Tile {
    instance_id: String,
    label: String,
    bypassed: bool,
    footswitch: Option<usize>,
}

struct MenuView {
    title: String,
    /// (key, label, actionable)
    rows: Vec<(String, String, bool)>,
    highlight: usize,
}

enum Overlay {
    Home,
    Menu(MenuView),
    Value { title: String, param: Parameter },
    Splash { boot: bool },
}

/// Everything currently on the emulated LCD.
struct Screen {
    toolbar: bool,
    pedalboard: String,
    preset: Option<String>,
    invert_pedalboard: bool,
    invert_preset: bool,
    tools: Vec<Tool>,
    tool_selected: Option<Tool>,
    relay_enabled: bool,
    hotspot: bool,
    tiles: Vec<Tile>,
    plugin_selected: Option<String>,
    analog: Vec<String>,
    message: Option<String>,
    overlay: Overlay,
}

impl Screen {
    fn new(toolbar: bool) -> Self {
        Screen {
            toolbar,
            pedalboard: String::new(),
            preset: None,
            invert_pedalboard: false,
            invert_preset: false,
            tools: Vec::new(),
            tool_selected: None,
            relay_enabled: false,
            hotspot: false,
            tiles: Vec::new(),
            plugin_selected: None,
            analog: Vec::new(),
            message: None,
            overlay: Overlay::Splash { boot: true },
        }
    }
}

fn menu_key_text(key: &MenuKey) -> String {
    match key {
        MenuKey::Index(i) => i.to_string(),
        MenuKey::Name(n) => n.clone(),
    }
}

fn tool_span(screen: &Screen, tool: Tool) -> Span<'static> {
    let (label, mut style) = match tool {
        Tool::Wifi if screen.hotspot => ("WiFi", Style::default().fg(Color::Green)),
        Tool::Wifi => ("WiFi", Style::default().fg(Color::DarkGray)),
        Tool::Bypass if screen.relay_enabled => ("Bypass", Style::default().fg(Color::Red)),
        Tool::Bypass => ("Bypass", Style::default().fg(Color::Green)),
        Tool::System => ("System", Style::default().fg(Color::White)),
    };
    if screen.tool_selected == Some(tool) {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(label, style)
}

fn render_screen(frame: &mut Frame, screen: &Screen) {
    let area = frame.area();
    let tools_height = if screen.toolbar { 1 } else { 0 };
    let [title_area, tools_area, body_area, analog_area, message_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(tools_height),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        TitleBar::new(&screen.pedalboard, screen.preset.as_deref())
            .invert(screen.invert_pedalboard, screen.invert_preset),
        title_area,
    );

    if screen.toolbar {
        let mut spans = Vec::new();
        for (i, tool) in screen.tools.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(tool_span(screen, *tool));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), tools_area);
    }

    match &screen.overlay {
        Overlay::Home => {
            let tiles: Vec<PluginTile> = screen
                .tiles
                .iter()
                .map(|t| PluginTile {
                    label: &t.label,
                    bypassed: t.bypassed,
                    selected: screen.plugin_selected.as_deref() == Some(t.instance_id.as_str()),
                    footswitch: t.footswitch,
                })
                .collect();
            frame.render_widget(PluginStrip::new(&tiles), body_area);
        }
        Overlay::Menu(menu) => {
            let rows: Vec<MenuRow> = menu
                .rows
                .iter()
                .map(|(key, label, actionable)| MenuRow {
                    key,
                    label,
                    actionable: *actionable,
                })
                .collect();
            frame.render_widget(Clear, body_area);
            frame.render_widget(MenuList::new(&menu.title, &rows, menu.highlight), body_area);
        }
        Overlay::Value { title, param } => {
            let popup = centered_rect(body_area.width.saturating_sub(4), 5, body_area);
            let block = Block::default()
                .borders(Borders::ALL)
                .title(title.as_str())
                .border_style(Style::default().fg(Color::Cyan));
            let inner = block.inner(popup);
            frame.render_widget(Clear, popup);
            frame.render_widget(block, popup);
            frame.render_widget(
                ValueGraph::new(&param.name, param.value, param.minimum, param.maximum),
                inner,
            );
        }
        Overlay::Splash { boot } => {
            let popup = centered_rect(20, 2, body_area);
            let mut lines = vec![Line::styled(
                "pi-Stomp",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )];
            if *boot {
                lines.push(Line::styled("starting...", Style::default().fg(Color::DarkGray)));
            }
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), popup);
        }
    }

    frame.render_widget(
        Paragraph::new(screen.analog.join("  ")).style(Style::default().fg(Color::Cyan)),
        analog_area,
    );
    if let Some(msg) = &screen.message {
        frame.render_widget(
            Paragraph::new(msg.as_str()).style(Style::default().fg(Color::DarkGray)),
            message_area,
        );
    }
}

/// Emulates the device LCD in the terminal's alternate screen.
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    screen: Screen,
}

impl TerminalDisplay {
    pub fn new(toolbar: bool) -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        let mut display = TerminalDisplay {
            terminal,
            screen: Screen::new(toolbar),
        };
        display.render();
        Ok(display)
    }

    fn render(&mut self) {
        let screen = &self.screen;
        if let Err(e) = self.terminal.draw(|frame| render_screen(frame, screen)) {
            log::warn!("Failed to draw display: {e}");
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen).ok();
        crossterm::terminal::disable_raw_mode().ok();
        self.terminal.show_cursor().ok();
    }
}

impl DisplaySink for TerminalDisplay {
    fn supports_toolbar(&self) -> bool {
        self.screen.toolbar
    }

    fn draw_title(
        &mut self,
        pedalboard: &str,
        preset: Option<&str>,
        invert_pedalboard: bool,
        invert_preset: bool,
        _highlight_only: bool,
    ) {
        self.screen.pedalboard = pedalboard.to_string();
        self.screen.preset = preset.map(str::to_string);
        self.screen.invert_pedalboard = invert_pedalboard;
        self.screen.invert_preset = invert_preset;
        self.render();
    }

    fn draw_tools(&mut self, tools: &[Tool]) {
        self.screen.tools = tools.to_vec();
        self.render();
    }

    fn draw_tool_select(&mut self, tool: Tool) {
        self.screen.tool_selected = Some(tool);
        self.screen.plugin_selected = None;
        self.render();
    }

    fn update_bypass(&mut self, enabled: bool) {
        self.screen.relay_enabled = enabled;
        self.render();
    }

    fn update_wifi(&mut self, status: &WifiStatus) {
        self.screen.hotspot = status.hotspot_active();
        self.render();
    }

    fn draw_plugins(&mut self, plugins: &[Plugin]) {
        self.screen.tiles = plugins
            .iter()
            .map(|p| Tile {
                instance_id: p.instance_id.clone(),
                label: p.instance_id.clone(),
                bypassed: p.bypassed,
                footswitch: None,
            })
            .collect();
        self.screen.overlay = Overlay::Home;
        self.render();
    }

    fn draw_bound_plugins(&mut self, plugins: &[Plugin], footswitches: &[Footswitch]) {
        for tile in &mut self.screen.tiles {
            let Some(plugin) = plugins.iter().find(|p| p.instance_id == tile.instance_id) else {
                continue;
            };
            tile.bypassed = plugin.bypassed;
            tile.footswitch = footswitches
                .iter()
                .find(|f| f.binding.as_ref().is_some_and(|b| plugin.controllers.contains(b)))
                .map(|f| f.index);
        }
        self.render();
    }

    fn draw_plugin_select(&mut self, plugin: Option<&Plugin>) {
        self.screen.plugin_selected = plugin.map(|p| p.instance_id.clone());
        self.screen.tool_selected = None;
        self.render();
    }

    fn draw_analog_assignments(&mut self, assignments: &BTreeMap<String, AnalogAssignment>) {
        self.screen.analog = assignments
            .iter()
            .map(|(name, a)| format!("{}:{name}", a.controller))
            .collect();
        self.render();
    }

    fn draw_info_message(&mut self, message: &str) {
        self.screen.message = Some(message.to_string());
        self.render();
    }

    fn draw_value_edit(&mut self, title: &str, param: &Parameter) {
        self.screen.overlay = Overlay::Value {
            title: title.to_string(),
            param: param.clone(),
        };
        self.render();
    }

    fn draw_value_edit_graph(&mut self, param: &Parameter, value: f32) {
        if let Overlay::Value { param: shown, .. } = &mut self.screen.overlay {
            if shown.symbol == param.symbol {
                shown.value = value;
            }
        }
        self.render();
    }

    fn menu_show(&mut self, menu: &Menu) {
        let rows = menu
            .entries()
            .map(|(key, item)| {
                let key = menu_key_text(key);
                let label = if item.label.is_empty() { key.clone() } else { item.label.clone() };
                (key, label, item.action.is_some())
            })
            .collect();
        self.screen.overlay = Overlay::Menu(MenuView {
            title: menu.title.clone(),
            rows,
            highlight: menu.cursor(),
        });
        self.render();
    }

    fn menu_highlight(&mut self, index: usize) {
        if let Overlay::Menu(menu) = &mut self.screen.overlay {
            menu.highlight = index;
        }
        self.render();
    }

    fn splash_show(&mut self, boot: bool) {
        self.screen.overlay = Overlay::Splash { boot };
        self.render();
    }

    fn clear_select(&mut self) {
        self.screen.plugin_selected = None;
        self.screen.tool_selected = None;
        self.render();
    }
}

use crate::app::{App, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pairsync::models::SyncMode;

impl App {
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.shutdown();
            return;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Connect | InputMode::GoTo => self.handle_input_key(key),
            InputMode::ConfirmSync(mode) => self.handle_confirm_sync_key(key, mode),
            InputMode::ConfirmDelete => self.handle_confirm_delete_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.shutdown(),
            KeyCode::Tab | KeyCode::BackTab => self.switch_pane(),
            KeyCode::Up | KeyCode::Char('k') => self.active_pane_mut().move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.active_pane_mut().move_cursor(1),
            KeyCode::Enter => self.active_pane_mut().open_current(),
            KeyCode::Backspace => self.active_pane_mut().go_parent(),
            KeyCode::Char(' ') => {
                let pane = self.active_pane_mut();
                pane.toggle_current();
                pane.move_cursor(1);
            }
            KeyCode::Char('a') => self.active_pane_mut().clear_selection(),
            KeyCode::Char('r') => self.active_pane_mut().refresh(),
            KeyCode::Char('c') => self.begin_input(InputMode::Connect, String::new()),
            KeyCode::Char('g') => {
                let current = self.pane(self.active).endpoint().path.clone();
                self.begin_input(InputMode::GoTo, current);
            }
            KeyCode::Char('x') => self.disconnect_active(),
            KeyCode::Char('R') => self.retry_active(),
            KeyCode::Char('t') => {
                self.direction = self.direction.toggled();
                self.set_status(format!("Direction: {}", self.direction));
            }
            KeyCode::Char('f') => self.request_sync(SyncMode::Force),
            KeyCode::Char('s') => self.request_sync(SyncMode::Slurp),
            KeyCode::Char('K') => self.cancel_sync(),
            KeyCode::Char('L') => self.clear_log(),
            KeyCode::Char('D') => {
                if self.pane(self.active).selection().is_empty() {
                    self.set_status("Nothing selected");
                } else {
                    self.input_mode = InputMode::ConfirmDelete;
                }
            }
            _ => {}
        }
    }

    fn begin_input(&mut self, mode: InputMode, initial: String) {
        self.input = initial;
        self.input_mode = mode;
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                let value = std::mem::take(&mut self.input);
                let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
                match mode {
                    InputMode::Connect => self.connect_active(&value),
                    InputMode::GoTo => self.go_to(&value),
                    _ => {}
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn handle_confirm_sync_key(&mut self, key: KeyEvent, mode: SyncMode) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.start_sync(mode, true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.set_status("Sync cancelled");
            }
            _ => {}
        }
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.input_mode = InputMode::Normal;
                self.delete_selection();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }
}

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Child, Command as Process, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use chip8_rpc::{
    driver::{Cli, Command, CommandResult, PollResult, Session},
    emu::{DISPLAY_X, DISPLAY_Y, timing::TIMER_TICK},
    io::{Io, IoError, Timers},
    rpc::{Client, Link, spawn_local_server},
};

const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

/// Pacing gives up on catching up once it falls this far behind.
const MAX_LAG: Duration = Duration::from_millis(100);

type Reader = Box<dyn BufRead>;
type Writer = Box<dyn Write>;

/// Driver-side `Io` backed by the terminal.
///
/// Timers follow the server's clock, and `sync` sleeps until wall time
/// catches up with emulated time.
struct TerminalIo {
    timers: Timers,
    key_press_times: [Option<Instant>; 16],

    /// Wall clock instant matching `anchor_time` on the emulated clock
    anchor: Instant,
    anchor_time: u64,
}

impl TerminalIo {
    fn new() -> Self {
        Self {
            timers: Timers::default(),
            key_press_times: [None; 16],
            anchor: Instant::now(),
            anchor_time: 0,
        }
    }

    fn press(&mut self, key: usize) {
        self.key_press_times[key] = Some(Instant::now());
    }

    fn check_key_timeout(&mut self) {
        let now = Instant::now();

        for press_time in self.key_press_times.iter_mut() {
            if let Some(time) = press_time
                && now.duration_since(*time) > KEY_RELEASE_TIMEOUT
            {
                *press_time = None;
            }
        }
    }

    fn keypad(&self) -> [bool; 16] {
        self.key_press_times.map(|time| time.is_some())
    }

    fn pace(&mut self, time: u64) {
        if time < self.anchor_time {
            self.anchor = Instant::now();
            self.anchor_time = time;
            return;
        }

        let target = self.anchor + Duration::from_micros(time - self.anchor_time);
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        } else if now - target > MAX_LAG {
            self.anchor = now;
            self.anchor_time = time;
        }
    }
}

impl Io for TerminalIo {
    fn sync(&mut self, time: u64) -> Result<(), IoError> {
        self.timers.sync(time);
        self.pace(time);
        Ok(())
    }

    fn is_key_down(&mut self, key: u8) -> Result<bool, IoError> {
        self.check_key_timeout();
        Ok(self.key_press_times[(key & 0x0F) as usize].is_some())
    }

    fn next_key(&mut self) -> Result<u8, IoError> {
        loop {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return Err(IoError::Disconnected);
                }
                if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                    self.press(idx);
                    return Ok(idx as u8);
                }
            }
        }
    }

    fn set_sound(&mut self, ticks: u8) -> Result<(), IoError> {
        self.timers.set_sound(ticks);
        Ok(())
    }

    fn set_delay(&mut self, ticks: u8) -> Result<(), IoError> {
        self.timers.set_delay(ticks);
        Ok(())
    }

    fn get_delay(&mut self) -> Result<u8, IoError> {
        Ok(self.timers.delay())
    }
}

/// Where the server lives.
enum Backend {
    Thread(JoinHandle<Result<(), IoError>>),
    Process(Child),
}

impl Backend {
    fn connect(server: Option<&PathBuf>) -> anyhow::Result<(Reader, Writer, Backend)> {
        match server {
            None => {
                let (link, handle) =
                    spawn_local_server().context("Failed to start the local server")?;
                let (reader, writer) = link.into_parts();
                let reader: Reader = Box::new(reader);
                let writer: Writer = Box::new(writer);
                Ok((reader, writer, Backend::Thread(handle)))
            }
            Some(path) => {
                let mut child = Process::new(path)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("Failed to start server {}", path.display()))?;

                let stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| anyhow!("Server stdin is not piped"))?;
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| anyhow!("Server stdout is not piped"))?;

                let reader: Reader = Box::new(BufReader::new(stdout));
                let writer: Writer = Box::new(stdin);
                Ok((reader, writer, Backend::Process(child)))
            }
        }
    }

    fn wait(self) -> anyhow::Result<()> {
        match self {
            Backend::Thread(handle) => handle
                .join()
                .map_err(|_| anyhow!("Server thread panicked"))?
                .context("Server failed"),
            Backend::Process(mut child) => {
                let status = child.wait().context("Failed to wait for server")?;
                log::info!("server exited with {status}");
                Ok(())
            }
        }
    }
}

struct App {
    session: Session<Reader, Writer, TerminalIo>,
    input: String,
    output: String,
    should_quit: bool,
    last_command: Option<Command>,
}

impl App {
    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            // Handles execution when the session is in running mode
            match self.session.poll() {
                Ok(PollResult::Halted) => {
                    self.output = "Machine halted".to_string();
                }
                Err(e) => {
                    self.output = e.to_string();
                }
                _ => {}
            }

            terminal.draw(|frame| self.draw(frame))?;

            self.session.driver_mut().check_key_timeout();

            let timeout = if self.session.is_running() {
                Duration::ZERO
            } else {
                Duration::from_millis(16)
            };
            while event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key_event(key);
                }
                if !self.session.is_running() {
                    break;
                }
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Handle Ctrl+C globally
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.session.is_running() {
            match key.code {
                KeyCode::Esc => {
                    self.session.execute_pause();
                    self.output = "Paused".to_string();
                }
                _ => {
                    if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                        self.session.driver_mut().press(idx);
                    }
                }
            }
        } else if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Enter => {
                    self.handle_enter();
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                _ => {}
            }
        }
    }

    fn handle_enter(&mut self) {
        if self.input.is_empty() {
            if let Some(command) = self.last_command.clone() {
                self.execute_command(command);
            }
        } else {
            match Cli::try_parse_from(self.input.split_whitespace()) {
                Ok(cli) => {
                    self.last_command = Some(cli.command.clone());
                    self.execute_command(cli.command);
                }
                Err(e) => {
                    self.output = e.to_string();
                    self.last_command = None;
                }
            }
        }

        self.input.clear();
    }

    fn execute_command(&mut self, command: Command) {
        match self.session.execute(command) {
            Ok(CommandResult::Ok) => {
                self.output = "OK".to_string();
            }
            Ok(CommandResult::Quit) => {
                self.should_quit = true;
            }
            Ok(CommandResult::MemDump { data, offset }) => {
                let mut output = String::new();

                for (i, byte) in data.iter().enumerate() {
                    if i % 16 == 0 {
                        output.push_str(&format!("\n{:03X}: ", offset as usize + i));
                    }
                    output.push_str(&format!("{:02X} ", byte));
                }

                self.output = output;
            }
            Ok(CommandResult::Disasm {
                instructions,
                offset,
            }) => {
                let mut output = String::new();

                for (i, (word, opcode)) in instructions.iter().enumerate() {
                    output.push_str(&format!(
                        "{:03X}: {:04X} - {:?}\n",
                        offset as usize + i * 2,
                        word,
                        opcode
                    ));
                }

                self.output = output;
            }
            Err(e) => {
                self.output = e.to_string();
            }
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Check if we have enough space
        const MIN_WIDTH: u16 = DISPLAY_X as u16 + 2 + 17 + 2;
        const MIN_HEIGHT: u16 = DISPLAY_Y as u16 + 2 + 1 + 2 + 1 + 2;
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!(
                "Terminal is too small ({}x{} min)",
                MIN_WIDTH, MIN_HEIGHT
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::bordered())
            .render(center, buf);

            return;
        }

        let [left, right] = Layout::horizontal([
            Constraint::Min(DISPLAY_X as u16 + 2),
            Constraint::Length(17 + 2),
        ])
        .areas(area);

        let [display, output, input] = Layout::vertical([
            Constraint::Length(DISPLAY_Y as u16 + 2),
            Constraint::Min(1 + 2),
            Constraint::Length(1 + 2),
        ])
        .areas(left);

        let [state, registers, keypad, stack] = Layout::vertical([
            Constraint::Length(1 + 2),
            Constraint::Length(13 + 2),
            Constraint::Length(4 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(right);

        self.render_display(display, buf);
        self.render_state(state, buf);
        self.render_registers(registers, buf);
        self.render_keypad(keypad, buf);
        self.render_stack(stack, buf);
        self.render_output(output, buf);
        self.render_input(input, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let display = self.session.display();
        let text: Vec<Line> = (0..DISPLAY_Y)
            .map(|y| {
                (0..DISPLAY_X)
                    .map(|x| {
                        Span::styled(
                            if display.pixel(x, y) { "█" } else { " " },
                            Style::default().fg(Color::Green),
                        )
                    })
                    .collect()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Display "))
            .render(area, buf);
    }

    fn render_registers(&self, area: Rect, buf: &mut Buffer) {
        let mut lines = Vec::new();

        if let Some(cpu) = self.session.cpu() {
            let timers = &self.session.driver().timers;

            lines.push(Line::from(format!("PC: {:03X}  I: {:03X}", cpu.pc, cpu.i)));
            lines.push(Line::from(format!(
                "SP: {:03X}  DT: {:02X}",
                cpu.sp,
                timers.delay()
            )));
            lines.push(Line::from(format!("T: {:>12}us", cpu.time)));
            lines.push(Line::from(format!("Faults: {}", cpu.errors)));
            lines.push(Line::from(""));

            for idx in 0..8 {
                lines.push(Line::from(format!(
                    "V{:X}: {:02X}   V{:X}: {:02X}",
                    idx,
                    cpu.v[idx],
                    idx + 8,
                    cpu.v[idx + 8]
                )));
            }
        } else {
            lines.push(Line::from("No data"));
        }

        Paragraph::new(lines)
            .block(Block::bordered().title(" Registers "))
            .render(area, buf);
    }

    fn render_stack(&self, area: Rect, buf: &mut Buffer) {
        let max_lines = area.height as usize - 2;

        let mut lines: Vec<Line> = self
            .session
            .stack()
            .iter()
            .enumerate()
            .map(|(i, val)| Line::from(format!("{:02}: {:03X}", i, val)))
            .collect();

        if lines.is_empty() {
            lines.push(Line::from("Empty"));
        }

        if lines.len() > max_lines {
            // Display only the last `max_lines - 1` items with "..." at the top
            lines = std::iter::once(Line::from("..."))
                .chain(lines.into_iter().rev().take(max_lines - 1).rev())
                .collect();
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Stack "))
            .render(area, buf);
    }

    fn render_output(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.output.as_str())
            .block(Block::bordered().title(" Output "))
            .render(area, buf);
    }

    fn render_input(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.input.as_str())
            .block(Block::bordered().title(" Command "))
            .render(area, buf);
    }

    fn render_state(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = if self.session.is_running() {
            ("RUNNING", Color::Green)
        } else {
            ("PAUSED", Color::Yellow)
        };

        let mut spans = vec![Span::styled(text, Style::default().fg(color))];
        if self.session.driver().timers.sound_active() {
            spans.push(Span::raw(" ♪"));
        }

        Paragraph::new(Text::from(Line::from(spans)))
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" State "))
            .render(area, buf);
    }

    fn render_keypad(&self, area: Rect, buf: &mut Buffer) {
        let keypad = self.session.driver().keypad();
        let layout = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];

        let lines = layout
            .iter()
            .map(|row| {
                row.iter()
                    .map(|key| {
                        let key_str = format!("{:X}", key);

                        Span::styled(
                            key_str,
                            if keypad[*key] {
                                Style::default().fg(Color::Black).bg(Color::White)
                            } else {
                                Style::default()
                            },
                        )
                    })
                    .flat_map(|s| [s, Span::raw(" ")])
                    .take(row.len() * 2 - 1)
                    .collect()
            })
            .collect::<Vec<Line>>();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Keypad "))
            .render(area, buf);
    }
}

/// Terminal driver for a CHIP-8 server
#[derive(Parser)]
struct Args {
    /// Path to the ROM file, as seen by the server
    rom_path: String,

    /// Server executable to spawn; without it the server runs in-process
    #[arg(long, conflicts_with = "local")]
    server: Option<PathBuf>,

    /// Run the server on a thread of this process (the default)
    #[arg(long)]
    local: bool,

    /// Emulated microseconds run per frame
    #[arg(long, default_value_t = TIMER_TICK, value_parser = clap::value_parser!(u64).range(1..))]
    frame_budget: u64,

    /// Write logs to this file, filtered by RUST_LOG
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log {
        let file = File::create(path).context("Failed to create log file")?;
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }

    if !Path::new(&args.rom_path).is_file() {
        bail!("ROM file {} does not exist", args.rom_path);
    }

    let server = if args.local { None } else { args.server.as_ref() };
    let (reader, writer, backend) = Backend::connect(server)?;
    let client = Client::connect(Link::new(reader, writer), TerminalIo::new())
        .context("Failed to connect to the server")?;

    let mut session = Session::new(client).with_frame_budget(args.frame_budget);
    session
        .execute(Command::Load {
            path: args.rom_path.clone(),
        })
        .context("Failed to load ROM")?;

    let mut app = App {
        session,
        input: String::new(),
        output: String::new(),
        should_quit: false,
        last_command: None,
    };

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    let quit_result = app.session.quit();
    app_result?;
    quit_result.context("Failed to stop the server")?;

    backend.wait()
}

use std::io::{self, BufRead, Write};

use monitor::error::MonitorError;
use monitor::link::Channel;
use monitor::listing::LineClass;
use monitor::session::Session;
use z80::registers::Reg16;

use crate::asm::Assembly;

const TAB_WIDTH: usize = 8;

/// Listing lines shown on each side of the program counter.
const CONTEXT_LINES: usize = 6;

const HELP: &str = "\
  s            step one instruction (full register report)
  n            step over calls
  c            continue until breakpoint or halt
  b <addr>     toggle breakpoint at hex address
  x            clear all breakpoints
  l            show the listing around the program counter
  g            show the last known registers
  m [page]     show a 256-byte memory page (hex page number)
  k <byte>     send a keypress to the target
  r            re-upload the program and reset
  q            quit";

/// Line-oriented operator prompt. Everything here is presentation; the
/// session is the single owner of all target state.
pub(crate) struct Repl<C: Channel> {
    session: Session<C>,
    assembly: Assembly,
    lines: Vec<String>,
    memory_page: u8,
}

impl<C: Channel> Repl<C> {
    pub(crate) fn new(session: Session<C>, assembly: Assembly) -> Repl<C> {
        let lines = assembly.listing.lines().map(expand_tabs).collect();
        Repl {
            session,
            assembly,
            lines,
            memory_page: 0x20,
        }
    }

    /// Provisions the target and enters the prompt loop. `scrub` wipes the
    /// program memory region before the first upload; `autorun` resumes the
    /// target right away instead of waiting at the entry point.
    pub(crate) fn run(&mut self, scrub: bool, autorun: bool) -> Result<(), MonitorError> {
        self.provision(scrub)?;
        if autorun {
            self.resume()?;
        } else {
            self.show_stop();
        }

        let stdin = io::stdin();
        loop {
            print!("zdb> ");
            io::stdout().flush().ok();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => (),
            }
            let mut words = line.split_whitespace();
            let Some(command) = words.next() else { continue };
            let argument = words.next();

            if command == "q" {
                break;
            }
            match self.dispatch(command, argument) {
                Ok(()) => (),
                // A dead channel is not worth prompting on.
                Err(e @ MonitorError::Transport { .. }) => return Err(e),
                Err(e) => println!("{}", e),
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, command: &str, argument: Option<&str>) -> Result<(), MonitorError> {
        match command {
            "s" => {
                self.session.debug_step()?;
                self.show_stop();
            }
            "n" => {
                self.session.step_over()?;
                self.show_stop();
            }
            "c" => self.resume()?,
            "b" => match argument.and_then(|a| u16::from_str_radix(a, 16).ok()) {
                Some(address) => {
                    self.session.swap_breakpoint(address)?;
                    self.show_breakpoints();
                }
                None => println!("Usage: b <hex address>"),
            },
            "x" => {
                self.session.clear_breakpoints()?;
                println!("All breakpoints cleared.");
            }
            "l" => self.show_context(),
            "g" => self.show_registers(),
            "m" => {
                if let Some(page) = argument.and_then(|a| u8::from_str_radix(a, 16).ok()) {
                    self.memory_page = page;
                }
                self.session.update_page(self.memory_page)?;
                self.show_memory();
            }
            "k" => match argument.and_then(|a| a.parse::<u8>().ok()) {
                Some(key) => self.session.emulate_keypress(key)?,
                None => println!("Usage: k <byte 0-255>"),
            },
            "r" => {
                self.provision(false)?;
                self.show_stop();
            }
            "h" | "?" => println!("{}", HELP),
            other => println!("Unknown command {:?}. Type h for help.", other),
        }
        Ok(())
    }

    fn provision(&mut self, scrub: bool) -> Result<(), MonitorError> {
        if scrub {
            println!("Clearing ROM...");
        }
        println!("Uploading ROM...");
        self.session
            .load_program(&self.assembly.image, &self.assembly.listing, scrub)
    }

    fn resume(&mut self) -> Result<(), MonitorError> {
        println!("Running...");
        match self.session.run() {
            Ok(_) => {
                self.show_stop();
                Ok(())
            }
            Err(MonitorError::Cancelled) => {
                println!("Gave up waiting; target was reset.");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn show_stop(&self) {
        self.show_context();
        self.show_registers();
    }

    fn show_context(&self) {
        let pc = self.session.pc();
        let Some(center) = self.session.listing().line_of_address(pc) else {
            println!("PC {:04X} is not in the listing.", pc);
            return;
        };
        let first = center.saturating_sub(CONTEXT_LINES);
        let last = (center + CONTEXT_LINES + 1).min(self.lines.len());
        for index in first..last {
            let marker = match self.session.line_class(index) {
                LineClass::CurrentPc => '>',
                LineClass::Breakpoint => '*',
                LineClass::Plain => ' ',
            };
            println!(" {} {}", marker, self.lines[index]);
        }
    }

    fn show_registers(&self) {
        let regs = self.session.registers();
        let word = |value: Option<u16>| match value {
            Some(value) => format!("{:04X}", value),
            None => String::from("????"),
        };

        println!("PC:{:04X}  {}", self.session.pc(), regs);
        let mut shadows = String::new();
        for reg in [Reg16::AFShadow, Reg16::BCShadow, Reg16::DEShadow, Reg16::HLShadow] {
            shadows.push_str(&format!("{}:{} ", reg, word(regs.get(reg))));
        }
        let stack: Vec<String> = regs.stack_peek().iter().map(|w| format!("{:04X}", w)).collect();
        println!("{} Stack: PUSH-> {}", shadows, stack.join(" "));
    }

    fn show_breakpoints(&self) {
        if self.session.breakpoints().is_empty() {
            println!("No breakpoints set.");
            return;
        }
        let addresses: Vec<String> = self
            .session
            .breakpoints()
            .iter()
            .map(|address| format!("{:04X}", address))
            .collect();
        println!("Breakpoints: {}", addresses.join(" "));
    }

    fn show_memory(&self) {
        for row in 0u16..16 {
            let address = self.memory_page as u16 * 256 + row * 16;
            let bytes = self.session.memory().range(address, 16);

            let mut hex = String::new();
            let mut ascii = String::new();
            for (column, byte) in bytes.iter().enumerate() {
                if column == 8 {
                    hex.push(' ');
                }
                hex.push_str(&format!("{:02X} ", byte));
                ascii.push(if *byte >= 32 && *byte < 127 { *byte as char } else { '.' });
            }
            println!("{:04X}  : {} {}", address, hex, ascii);
        }
    }
}

fn expand_tabs(line: &str) -> String {
    let mut result = String::new();
    for c in line.chars() {
        if c == '\t' {
            let spaces = TAB_WIDTH - (result.len() % TAB_WIDTH);
            for _ in 0..spaces {
                result.push(' ');
            }
        } else {
            result.push(c);
        }
    }
    result
}

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use serialport::SerialPort;
use snafu::{ensure, OptionExt};
use z80::instruction::CallClass;
use z80::registers::{Reg16, REGISTER_COUNT};

use crate::cpu::RegisterFile;
use crate::error::{CancelledSnafu, MalformedReplySnafu, MonitorError};
use crate::link::{Channel, Link};
use crate::listing::{LineClass, ListingMap};
use crate::loader;
use crate::memory::{MemoryImage, PAGE_SIZE};

/// Breakpoint slot value the stub uses for "empty".
const EMPTY_SLOT: i32 = -1;

/// Raised by a caller that gave up on a blocking resume. The session still
/// waits for the stop reply, then resets instead of trusting it.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// One debugging session against one target. Owns the link and every piece
/// of mirrored target state; all mutation funnels through `&mut self` on
/// the single owning thread, and a method blocked on the stub holds that
/// borrow until the reply lands. The mirrored PC is refreshed from each
/// stepping reply before the method returns, never carried over on faith.
pub struct Session<C: Channel> {
    pub(crate) link: Link<C>,
    pc: u16,
    registers: RegisterFile,
    breakpoints: BTreeSet<u16>,
    memory: MemoryImage,
    listing: ListingMap,
    cancel: CancelToken,
}

impl Session<Box<dyn SerialPort>> {
    /// Opens the serial device and handshakes with the resident stub.
    pub fn connect(port: &str) -> Result<Session<Box<dyn SerialPort>>, MonitorError> {
        info!("contacting debug stub on {}", port);
        Ok(Session::new(Link::open(port)?))
    }
}

impl<C: Channel> Session<C> {
    pub fn new(link: Link<C>) -> Session<C> {
        Session {
            link,
            pc: 0,
            registers: RegisterFile::new(),
            breakpoints: BTreeSet::new(),
            memory: MemoryImage::new(),
            listing: ListingMap::empty(),
            cancel: CancelToken::new(),
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn breakpoints(&self) -> &BTreeSet<u16> {
        &self.breakpoints
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    pub fn listing(&self) -> &ListingMap {
        &self.listing
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Full target reset, followed by a fast step to resynchronize the
    /// program counter.
    pub fn reset(&mut self) -> Result<(), MonitorError> {
        self.link.transact("R")?;
        self.step()?;
        Ok(())
    }

    /// Fast single step. Cheap because the stub only reports the new PC; the
    /// register snapshot becomes unknown.
    pub fn step(&mut self) -> Result<u16, MonitorError> {
        let reply = self.link.transact("n")?;
        self.pc = single_word(&reply)?;
        self.registers.clear();
        Ok(self.pc)
    }

    /// Single step with a full register report.
    pub fn debug_step(&mut self) -> Result<u16, MonitorError> {
        let reply = self.link.transact("N")?;
        let words = parse_words::<u16>(&reply)?;
        ensure!(
            words.len() >= REGISTER_COUNT,
            MalformedReplySnafu {
                msg: format!("register reply carried {} of {} words", words.len(), REGISTER_COUNT),
            }
        );
        self.registers.load(&words);
        self.pc = words[Reg16::PC.index()];
        Ok(self.pc)
    }

    /// Resumes execution and blocks until the target stops at a breakpoint
    /// or halt. The register snapshot becomes unknown.
    pub fn run(&mut self) -> Result<u16, MonitorError> {
        let reply = self.link.transact_blocking("x")?;
        self.pc = single_word(&reply)?;
        self.registers.clear();
        if self.cancel.take() {
            // The stop address arrived after the caller stopped waiting for
            // it; resynchronize rather than resume from a PC nobody wants.
            self.reset()?;
            return CancelledSnafu.fail();
        }
        Ok(self.pc)
    }

    /// Executes the instruction at PC as one unit. Call-class opcodes run
    /// until control returns to the following instruction; anything else
    /// degrades to an ordinary debug step. The probe reads the opcode byte
    /// from the target, not the image, which may be stale.
    pub fn step_over(&mut self) -> Result<u16, MonitorError> {
        let opcode = self.peek_byte(self.pc)?;
        let Some(class) = CallClass::classify(opcode) else {
            return self.debug_step();
        };
        let resume_at = self.pc.wrapping_add(class.length());
        // A breakpoint the operator already placed there does the job on its
        // own and must survive this operation.
        let planted = !self.breakpoints.contains(&resume_at);
        if planted {
            self.swap_breakpoint(resume_at)?;
        }
        let pc = self.run()?;
        if planted {
            self.swap_breakpoint(resume_at)?;
        }
        Ok(pc)
    }

    /// Toggles the breakpoint at `address`. The stub replies with its full
    /// slot table, which replaces the local mirror wholesale; membership is
    /// never computed on this side.
    pub fn swap_breakpoint(&mut self, address: u16) -> Result<(), MonitorError> {
        let reply = self.link.transact(&format!("k {}", address))?;
        let slots = parse_words::<i32>(&reply)?;
        self.breakpoints = slots
            .into_iter()
            .filter(|&slot| slot != EMPTY_SLOT)
            .map(|slot| slot as u16)
            .collect();
        Ok(())
    }

    /// Drops every breakpoint on the target, then empties the mirror.
    pub fn clear_breakpoints(&mut self) -> Result<(), MonitorError> {
        self.link.transact("c")?;
        self.breakpoints.clear();
        Ok(())
    }

    /// Fire and forget; this is the one command the stub does not reply to.
    pub fn emulate_keypress(&mut self, key: u8) -> Result<(), MonitorError> {
        self.link.send(&format!("U {}", key))
    }

    /// Refreshes one 256-byte page of the local memory image. The reply
    /// must carry exactly the whole page or the image stays untouched.
    pub fn update_page(&mut self, page: u8) -> Result<(), MonitorError> {
        let base = page as usize * PAGE_SIZE;
        let reply = self.link.transact(&format!("r {} {}", base, PAGE_SIZE))?;
        let bytes = parse_words::<u8>(&reply)?;
        ensure!(
            bytes.len() == PAGE_SIZE,
            MalformedReplySnafu {
                msg: format!("page reply carried {} of {} bytes", bytes.len(), PAGE_SIZE),
            }
        );
        self.memory.write_page(page, &bytes);
        Ok(())
    }

    /// Reads one byte straight from the target, bypassing the cached image
    /// except to refresh the byte it touched.
    pub fn peek_byte(&mut self, address: u16) -> Result<u8, MonitorError> {
        let reply = self.link.transact(&format!("r {} 1", address))?;
        let byte = single_word::<u8>(&reply)?;
        self.memory.write(address, byte);
        Ok(byte)
    }

    /// Provisions the target: optional scrub of the program memory region,
    /// chunked upload, full reset, wholesale rebuild of the listing map.
    pub fn load_program(&mut self, image: &[u8], listing: &str, scrub: bool) -> Result<(), MonitorError> {
        if scrub {
            self.erase_rom(loader::ROM_CAPACITY)?;
        }
        self.upload_rom(image)?;
        self.reset()?;
        self.listing = ListingMap::build(listing);
        Ok(())
    }

    pub fn upload_rom(&mut self, image: &[u8]) -> Result<(), MonitorError> {
        info!("uploading {} bytes", image.len());
        loader::upload(&mut self.link, image)
    }

    pub fn erase_rom(&mut self, length: usize) -> Result<(), MonitorError> {
        info!("scrubbing {} bytes of program memory", length);
        loader::erase(&mut self.link, length)
    }

    pub fn line_class(&self, line: usize) -> LineClass {
        match self.listing.address_of_line(line) {
            Some(address) if address == self.pc => LineClass::CurrentPc,
            Some(address) if self.breakpoints.contains(&address) => LineClass::Breakpoint,
            _ => LineClass::Plain,
        }
    }
}

fn single_word<T: FromStr>(reply: &[String]) -> Result<T, MonitorError> {
    let token = reply.first().context(MalformedReplySnafu {
        msg: "empty reply where a number was expected",
    })?;
    parse_word(token)
}

fn parse_words<T: FromStr>(reply: &[String]) -> Result<Vec<T>, MonitorError> {
    reply.iter().map(|token| parse_word(token)).collect()
}

fn parse_word<T: FromStr>(token: &str) -> Result<T, MonitorError> {
    token.parse().ok().context(MalformedReplySnafu {
        msg: format!("token {:?} is not a number", token),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    use z80::registers::Reg16;

    use crate::error::MonitorError;
    use crate::link::Link;
    use crate::listing::{LineClass, ListingMap};
    use crate::session::Session;

    /// Scripted stand-in for the target. Replies are queued up front, sent
    /// command lines are recorded, and a read past the end of the script
    /// behaves like a silent target: it times out.
    struct FakeStub {
        replies: VecDeque<String>,
        sent: Vec<String>,
        partial: Vec<u8>,
        pending: VecDeque<u8>,
    }

    impl FakeStub {
        fn new(replies: &[&str]) -> FakeStub {
            FakeStub {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                sent: Vec::new(),
                partial: Vec::new(),
                pending: VecDeque::new(),
            }
        }
    }

    impl Read for FakeStub {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                match self.replies.pop_front() {
                    Some(line) => {
                        self.pending.extend(line.bytes());
                        self.pending.push_back(b'\n');
                    }
                    None => return Err(io::ErrorKind::TimedOut.into()),
                }
            }
            buf[0] = self.pending.pop_front().unwrap();
            Ok(1)
        }
    }

    impl Write for FakeStub {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            for &byte in buf {
                if byte == b'\n' {
                    let line = std::mem::take(&mut self.partial);
                    self.sent.push(String::from_utf8(line).unwrap());
                } else {
                    self.partial.push(byte);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session(replies: &[&str]) -> Session<FakeStub> {
        Session::new(Link::new(FakeStub::new(replies)))
    }

    fn sent(session: &Session<FakeStub>) -> Vec<String> {
        session.link.channel.sent.clone()
    }

    #[test]
    fn handshake_accepts_any_non_fault_reply() {
        let mut link = Link::new(FakeStub::new(&["ok"]));
        link.handshake().unwrap();
        assert_eq!(link.channel.sent, vec!["h"]);
    }

    #[test]
    fn handshake_fails_on_fault_sentinel() {
        let mut link = Link::new(FakeStub::new(&["x"]));
        assert!(matches!(link.handshake(), Err(MonitorError::Fault)));
    }

    #[test]
    fn fast_step_updates_pc_and_forgets_registers() {
        let regs: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let mut session = session(&[&regs.join(" "), "1024"]);
        session.debug_step().unwrap();
        assert!(session.registers().is_known());

        let pc = session.step().unwrap();
        assert_eq!(pc, 1024);
        assert_eq!(session.pc(), 0x0400);
        assert_eq!(session.registers().get(Reg16::AF), None);
        assert_eq!(sent(&session), vec!["N", "n"]);
    }

    #[test]
    fn debug_step_loads_the_full_register_file() {
        let mut session = session(&["10 20 30 40 50 60 70 80 90 100 110 4660"]);
        let pc = session.debug_step().unwrap();
        assert_eq!(pc, 0x1234);
        assert_eq!(session.registers().get(Reg16::AF), Some(10));
        assert_eq!(session.registers().get(Reg16::SP), Some(110));
        assert_eq!(session.registers().get(Reg16::PC), Some(4660));
        assert!(session.registers().stack_peek().is_empty());
    }

    #[test]
    fn debug_step_keeps_trailing_words_as_stack_peek() {
        let mut session = session(&["1 2 3 4 5 6 7 8 9 10 11 12 100 200 300 400"]);
        session.debug_step().unwrap();
        assert_eq!(session.registers().stack_peek(), &[100, 200, 300, 400]);
    }

    #[test]
    fn short_register_reply_is_malformed() {
        let mut session = session(&["1 2 3"]);
        assert!(matches!(session.debug_step(), Err(MonitorError::MalformedReply { .. })));
        assert_eq!(session.pc(), 0);
        assert_eq!(session.registers().get(Reg16::AF), None);
    }

    #[test]
    fn reset_resynchronizes_with_a_fast_step() {
        let mut session = session(&["ok", "4660"]);
        session.reset().unwrap();
        assert_eq!(session.pc(), 0x1234);
        assert_eq!(session.registers().get(Reg16::PC), None);
        assert_eq!(sent(&session), vec!["R", "n"]);
    }

    #[test]
    fn run_reports_the_stop_address() {
        let mut session = session(&["768"]);
        let pc = session.run().unwrap();
        assert_eq!(pc, 768);
        assert_eq!(session.registers().get(Reg16::AF), None);
        assert_eq!(sent(&session), vec!["x"]);
    }

    #[test]
    fn swap_breakpoint_mirrors_the_slot_table_wholesale() {
        let mut session = session(&["768 -1 -1 300"]);
        session.swap_breakpoint(300).unwrap();
        let mirrored: Vec<u16> = session.breakpoints().iter().copied().collect();
        assert_eq!(mirrored, vec![300, 768]);
        assert_eq!(sent(&session), vec!["k 300"]);
    }

    #[test]
    fn swap_breakpoint_twice_restores_the_set() {
        let mut session = session(&["768 -1", "768 300", "768 -1"]);
        session.swap_breakpoint(768).unwrap();
        let before = session.breakpoints().clone();

        session.swap_breakpoint(300).unwrap();
        assert!(session.breakpoints().contains(&300));
        session.swap_breakpoint(300).unwrap();
        assert_eq!(session.breakpoints(), &before);
    }

    #[test]
    fn faulted_swap_leaves_the_set_untouched() {
        let mut session = session(&["768 -1", "x"]);
        session.swap_breakpoint(768).unwrap();
        let before = session.breakpoints().clone();

        assert!(matches!(session.swap_breakpoint(300), Err(MonitorError::Fault)));
        assert_eq!(session.breakpoints(), &before);
    }

    #[test]
    fn clear_breakpoints_empties_the_mirror_without_parsing() {
        let mut session = session(&["768 300", "whatever the stub says"]);
        session.swap_breakpoint(768).unwrap();
        session.clear_breakpoints().unwrap();
        assert!(session.breakpoints().is_empty());
        assert_eq!(sent(&session), vec!["k 768", "c"]);
    }

    #[test]
    fn keypress_is_fire_and_forget() {
        let mut session = session(&[]);
        session.emulate_keypress(65).unwrap();
        assert_eq!(sent(&session), vec!["U 65"]);
    }

    #[test]
    fn step_over_plain_opcode_is_a_debug_step() {
        // NOP at PC: no breakpoint games, just a debug step.
        let mut session = session(&["0", "1 2 3 4 5 6 7 8 9 10 11 1"]);
        let pc = session.step_over().unwrap();
        assert_eq!(pc, 1);
        assert!(session.registers().is_known());
        assert_eq!(sent(&session), vec!["r 0 1", "N"]);
    }

    #[test]
    fn step_over_call_plants_and_removes_a_temporary_breakpoint() {
        let mut session = session(&[
            "256",  // n
            "205",  // r 256 1 -> CALL nn
            "259",  // k 259: planted
            "259",  // x: stopped on the temporary breakpoint
            "-1",   // k 259: removed
        ]);
        session.step().unwrap();
        let pc = session.step_over().unwrap();
        assert_eq!(pc, 259);
        assert!(session.breakpoints().is_empty());
        assert_eq!(sent(&session), vec!["n", "r 256 1", "k 259", "x", "k 259"]);
    }

    #[test]
    fn step_over_leaves_an_existing_user_breakpoint_alone() {
        let mut session = session(&[
            "256",  // n
            "259",  // k 259: user breakpoint
            "205",  // r 256 1 -> CALL nn
            "259",  // x
        ]);
        session.step().unwrap();
        session.swap_breakpoint(259).unwrap();

        let pc = session.step_over().unwrap();
        assert_eq!(pc, 259);
        assert!(session.breakpoints().contains(&259));
        assert_eq!(sent(&session), vec!["n", "k 259", "r 256 1", "x"]);
    }

    #[test]
    fn step_over_restart_uses_the_one_byte_length() {
        let mut session = session(&[
            "256",  // n
            "231",  // r 256 1 -> RST 20
            "257",  // k 257
            "257",  // x
            "-1",   // k 257
        ]);
        session.step().unwrap();
        session.step_over().unwrap();
        assert_eq!(sent(&session), vec!["n", "r 256 1", "k 257", "x", "k 257"]);
    }

    fn probe_byte(address: u32) -> u8 {
        (address * 7 + 3) as u8
    }

    #[test]
    fn update_page_mirrors_every_byte_of_the_address_space() {
        let replies: Vec<String> = (0u32..256)
            .map(|page| {
                (0u32..256)
                    .map(|offset| probe_byte(page * 256 + offset).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let reply_refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let mut session = session(&reply_refs);

        for page in 0u16..256 {
            session.update_page(page as u8).unwrap();
        }
        for address in 0u32..65536 {
            assert_eq!(session.memory().read(address as u16), probe_byte(address));
        }
    }

    #[test]
    fn short_page_reply_is_rejected_without_touching_the_image() {
        let short: Vec<String> = (0..255).map(|i| i.to_string()).collect();
        let mut session = session(&[&short.join(" ")]);
        assert!(matches!(session.update_page(2), Err(MonitorError::MalformedReply { .. })));
        assert_eq!(session.memory().read(0x0200), 0xff);
    }

    #[test]
    fn peek_byte_refreshes_only_the_byte_it_touched() {
        let mut session = session(&["66"]);
        let byte = session.peek_byte(0x1000).unwrap();
        assert_eq!(byte, 66);
        assert_eq!(session.memory().read(0x1000), 66);
        assert_eq!(session.memory().read(0x1001), 0xff);
        assert_eq!(sent(&session), vec!["r 4096 1"]);
    }

    #[test]
    fn upload_goes_out_in_sixteen_byte_windows() {
        let image: Vec<u8> = (0u8..20).collect();
        let mut session = session(&["ok", "ok"]);
        session.upload_rom(&image).unwrap();

        let first: Vec<String> = (0..16).map(|i| i.to_string()).collect();
        assert_eq!(
            sent(&session),
            vec![
                format!("w 0 16 {}", first.join(" ")),
                String::from("w 16 4 16 17 18 19"),
            ]
        );
    }

    #[test]
    fn upload_abort_reports_the_committed_prefix() {
        let image: Vec<u8> = (0u8..40).collect();
        let mut session = session(&["ok", "x"]);
        match session.upload_rom(&image) {
            Err(MonitorError::UploadAborted { committed, .. }) => assert_eq!(committed, 16),
            other => panic!("expected an aborted upload, got {:?}", other),
        }
        // Two windows went out; only the first was acknowledged.
        assert_eq!(sent(&session).len(), 2);
    }

    #[test]
    fn erase_writes_zero_windows_across_the_region() {
        let mut session = session(&["ok", "ok"]);
        session.erase_rom(32).unwrap();
        let zeros = ["0"; 16].join(" ");
        assert_eq!(
            sent(&session),
            vec![format!("w 0 16 {}", zeros), format!("w 16 16 {}", zeros)]
        );
    }

    #[test]
    fn load_program_uploads_resets_and_rebuilds_the_listing() {
        let listing = "header\n   0100  start:  ld a,1\n";
        let mut session = session(&["ok", "ok", "256"]);
        session.load_program(&[1, 2, 3], listing, false).unwrap();

        assert_eq!(sent(&session), vec!["w 0 3 1 2 3", "R", "n"]);
        assert_eq!(session.listing().line_of_address(0x0100), Some(1));
        assert_eq!(session.line_class(1), LineClass::CurrentPc);
    }

    #[test]
    fn listing_map_is_bidirectional_and_skips_unaddressed_lines() {
        let listing = "vasm listing\n   00A0  ld a,1\n   no.a  comment\n\n   00B2  halt\n";
        let map = ListingMap::build(listing);
        assert_eq!(map.address_of_line(1), Some(0x00a0));
        assert_eq!(map.line_of_address(0x00a0), Some(1));
        assert_eq!(map.address_of_line(4), Some(0x00b2));
        assert_eq!(map.address_of_line(0), None);
        assert_eq!(map.address_of_line(2), None);
        assert_eq!(map.address_of_line(3), None);
    }

    #[test]
    fn duplicate_listing_addresses_resolve_to_the_last_line() {
        let listing = "   00A0  macro body\n   00A0  expansion\n";
        let map = ListingMap::build(listing);
        assert_eq!(map.line_of_address(0x00a0), Some(1));
        assert_eq!(map.address_of_line(0), Some(0x00a0));
        assert_eq!(map.address_of_line(1), Some(0x00a0));
    }

    #[test]
    fn line_class_tracks_pc_and_breakpoints() {
        let listing = "   0100  entry\n   0103  loop\nplain text\n";
        let mut session = session(&["ok", "ok", "256", "259"]);
        session.load_program(&[0, 0, 0], listing, false).unwrap();
        session.swap_breakpoint(0x0103).unwrap();

        assert_eq!(session.line_class(0), LineClass::CurrentPc);
        assert_eq!(session.line_class(1), LineClass::Breakpoint);
        assert_eq!(session.line_class(2), LineClass::Plain);
    }

    // The original tool would wait on a silent target forever; the bounded
    // read timeout is an added behavior, not a parity fix.
    #[test]
    fn silent_target_times_out_instead_of_hanging() {
        let mut session = session(&[]);
        assert!(matches!(session.step(), Err(MonitorError::Timeout)));
    }

    // Cancellation is likewise an added behavior: the stop address that
    // finally arrives after the caller gave up is discarded via a reset.
    #[test]
    fn cancelled_run_resets_instead_of_trusting_a_late_pc() {
        let mut session = session(&["512", "ok", "768"]);
        session.cancel_token().raise();

        assert!(matches!(session.run(), Err(MonitorError::Cancelled)));
        assert_eq!(session.pc(), 768);
        assert_eq!(sent(&session), vec!["x", "R", "n"]);
    }
}

//! Driver protocol tests
//!
//! Runs machines on worker threads and drives them through the channel set.

use intcode::{
    ChannelConfig, DriverError, Event, Machine, MemoryBus, Reply, Signal, StartError, TraceRecord,
    TraceSink,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

fn start(image: &[i64], config: ChannelConfig) -> intcode::Driver {
    Machine::from_image(image)
        .start(config)
        .expect("worker should start")
}

#[test]
fn test_inputs_echo_in_order() {
    // IN [11]; IN [12]; OUT [11]; OUT [12]
    let driver = start(&[3, 11, 3, 12, 4, 11, 4, 12, 99], ChannelConfig::default());

    driver.write(5).unwrap();
    driver.write(3).unwrap();

    assert_eq!(driver.read(), Reply::Output(5));
    assert_eq!(driver.read(), Reply::Output(3));
    assert_eq!(driver.read(), Reply::Halted);
}

#[test]
fn test_halt_leaves_memory_readable() {
    let driver = start(&[1, 0, 0, 0, 99], ChannelConfig::default());

    assert_eq!(driver.read(), Reply::Halted);
    let machine = driver.join().unwrap();
    assert!(machine.is_halted());
    assert_eq!(machine.get(0), 2);
}

#[test]
fn test_input_needed_follows_prior_output() {
    // OUT #1; IN [0]; HLT
    let driver = start(&[104, 1, 3, 0, 99], ChannelConfig::default());

    assert_eq!(driver.next_event(), Event::Output(1));
    assert_eq!(driver.next_event(), Event::Signal(Signal::InputNeeded));
    driver.write(77).unwrap();
    assert_eq!(driver.next_event(), Event::Signal(Signal::Halted));

    let machine = driver.join().unwrap();
    assert_eq!(machine.get(0), 77);
}

#[test]
fn test_read_until_input_needed_then_write() {
    // Interactive loop: double every input until a zero arrives
    // 0: IN [100]; 2: JF [100], #14; 5: MUL [100] * #2 -> [101]; 9: OUT [101]; 11: JT #1, #0; 14: HLT
    let image = [3, 100, 1006, 100, 14, 1002, 100, 2, 101, 4, 101, 1105, 1, 0, 99];
    let driver = start(&image, ChannelConfig::default());

    let mut inputs = vec![4, 10, 0].into_iter();
    let mut outputs = Vec::new();
    loop {
        match driver.next_event() {
            Event::Signal(Signal::InputNeeded) => {
                driver.write(inputs.next().expect("more inputs")).unwrap()
            }
            Event::Output(value) => outputs.push(value),
            Event::Signal(Signal::Halted) => break,
            Event::Signal(Signal::Errored) => panic!("{:?}", driver.error_detail()),
        }
    }

    assert_eq!(outputs, vec![8, 20]);
}

#[test]
fn test_errored_signal_and_detail() {
    let driver = start(&[98], ChannelConfig::default());

    assert_eq!(driver.read(), Reply::Errored);
    assert_eq!(
        driver.error_detail().as_deref(),
        Some("unknown opcode 98 at address 0")
    );
    // Detail is delivered exactly once
    assert_eq!(driver.error_detail(), None);

    // Terminal signal is sticky
    assert_eq!(driver.read(), Reply::Errored);
    assert_eq!(driver.write(1), Err(DriverError::Terminated));

    let machine = driver.join().unwrap();
    assert!(machine.is_errored());
}

#[test]
fn test_no_error_detail_on_halt() {
    let driver = start(&[99], ChannelConfig::default());
    assert_eq!(driver.read(), Reply::Halted);
    assert_eq!(driver.error_detail(), None);
    assert!(driver.is_terminated());
}

#[test]
fn test_outputs_until_halt() {
    let quine = [
        109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
    ];
    let driver = start(&quine, ChannelConfig::default());
    assert_eq!(driver.outputs_until_halt(), Ok(quine.to_vec()));
}

#[test]
fn test_outputs_until_halt_reports_error() {
    let driver = start(&[104, 1, 42], ChannelConfig::default());
    assert_eq!(
        driver.outputs_until_halt(),
        Err(DriverError::Errored(
            "unknown opcode 42 at address 2".to_string()
        ))
    );
}

#[test]
fn test_buffered_output_lets_machine_finish() {
    let config = ChannelConfig::default().output_capacity(3);
    let driver = start(&[104, 1, 104, 2, 104, 3, 99], config);

    // The machine never waits on the driver, so it halts unread
    while !driver.is_terminated() {
        std::thread::yield_now();
    }

    assert_eq!(driver.outputs_until_halt(), Ok(vec![1, 2, 3]));
}

#[test]
fn test_buffered_input_accepts_eager_writes() {
    // IN [0]; IN [1]; ADD [0] + [1] -> [2]; OUT [2]
    let config = ChannelConfig::default().input_capacity(2).name("adder");
    let driver = start(&[3, 0, 3, 1, 1, 0, 1, 2, 4, 2, 99], config);

    driver.write(5).unwrap();
    driver.write(3).unwrap();
    assert_eq!(driver.outputs_until_halt(), Ok(vec![8]));
}

#[test]
fn test_restart_of_terminated_machine_rejected() {
    let driver = start(&[99], ChannelConfig::default());
    assert_eq!(driver.read(), Reply::Halted);
    let machine = driver.join().unwrap();

    match machine.start(ChannelConfig::default()) {
        Err(StartError::AlreadyTerminated) => {}
        other => panic!("expected AlreadyTerminated, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_independent_machines_in_parallel() {
    // Each machine doubles its input
    let image = Machine::from_image(vec![3, 9, 1002, 9, 2, 9, 4, 9, 99, 0]);
    let drivers: Vec<_> = (0..4)
        .map(|i| {
            image
                .clone()
                .start(ChannelConfig::default().name(format!("worker-{}", i)))
                .unwrap()
        })
        .collect();

    for (i, driver) in drivers.iter().enumerate() {
        driver.write(i as i64 + 1).unwrap();
    }
    let results: Vec<_> = drivers
        .iter()
        .map(|driver| driver.outputs_until_halt().unwrap())
        .collect();

    assert_eq!(results, vec![vec![2], vec![4], vec![6], vec![8]]);
    // The template was never touched
    assert_eq!(image.get(9), 0);
}

#[test]
fn test_feedback_loop_between_machines() {
    // Two incrementers wired in a ring; each stops once its own output reaches 10
    // 0: IN [20]; 2: ADD [20] + #1 -> [20]; 6: OUT [20]; 8: LT [20] < #10 -> [21]; 12: JT [21], #0; 15: HLT
    let image = vec![3, 20, 1001, 20, 1, 20, 4, 20, 1007, 20, 10, 21, 1005, 21, 0, 99];
    let a = Machine::from_image(image.clone())
        .start(ChannelConfig::default().name("ring-a"))
        .unwrap();
    let b = Machine::from_image(image)
        .start(ChannelConfig::default().name("ring-b"))
        .unwrap();

    a.write(0).unwrap();
    let mut last = 0;
    loop {
        match a.read() {
            Reply::Output(value) => {
                last = value;
                if b.write(value).is_err() {
                    break;
                }
            }
            _ => break,
        }
        match b.read() {
            Reply::Output(value) => {
                last = value;
                if a.write(value).is_err() {
                    break;
                }
            }
            _ => break,
        }
    }

    // b stops after emitting 10, a still answers with 11
    assert_eq!(last, 11);
}

#[test]
fn test_handoff_write_waits_for_input_instruction() {
    // OUT #1; IN [9]; OUT [9]; HLT
    let driver = start(&[104, 1, 3, 9, 4, 9, 99], ChannelConfig::default());
    let written = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            driver.write(5).unwrap();
            written.store(true, Ordering::SeqCst);
        });

        // The machine is parked on its first output, not on IN
        thread::sleep(Duration::from_millis(100));
        assert!(!written.load(Ordering::SeqCst));

        assert_eq!(driver.next_event(), Event::Output(1));
        assert_eq!(driver.next_event(), Event::Signal(Signal::InputNeeded));
    });

    assert!(written.load(Ordering::SeqCst));
    assert_eq!(driver.read(), Reply::Output(5));
    assert_eq!(driver.read(), Reply::Halted);
}

/// Forwards records to the test thread; the channel closes when the worker exits
struct ChannelSink(mpsc::Sender<TraceRecord>);

impl TraceSink for ChannelSink {
    fn record(&mut self, record: &TraceRecord) {
        let _ = self.0.send(record.clone());
    }
}

/// Mnemonics executed by a worker, collected until its thread finishes
fn executed_until_exit(records: mpsc::Receiver<TraceRecord>) -> Vec<&'static str> {
    let mut executed = Vec::new();
    loop {
        match records.recv_timeout(Duration::from_secs(5)) {
            Ok(record) => executed.push(record.mnemonic),
            Err(RecvTimeoutError::Disconnected) => return executed,
            Err(RecvTimeoutError::Timeout) => panic!("worker still running after driver was dropped"),
        }
    }
}

#[test]
fn test_dropping_driver_stops_machine_blocked_on_input() {
    let (sender, records) = mpsc::channel();
    let driver = start(
        &[104, 7, 3, 0, 99],
        ChannelConfig::default().trace(ChannelSink(sender)),
    );

    assert_eq!(driver.next_event(), Event::Output(7));
    assert_eq!(driver.next_event(), Event::Signal(Signal::InputNeeded));
    drop(driver);

    // IN never completes and HLT is never reached
    assert_eq!(executed_until_exit(records), vec!["OUT"]);
}

#[test]
fn test_dropping_driver_stops_machine_blocked_on_output() {
    let (sender, records) = mpsc::channel();
    let driver = start(
        &[104, 1, 104, 2, 99],
        ChannelConfig::default().trace(ChannelSink(sender)),
    );
    drop(driver);

    // The first output is never taken, so nothing completes
    assert_eq!(executed_until_exit(records), Vec::<&str>::new());
}

#[test]
fn test_error_detail_follows_errored_signal() {
    let config = ChannelConfig::default().output_capacity(1);
    let driver = start(&[104, 1, 42], config);
    while !driver.is_terminated() {
        thread::yield_now();
    }

    // Not yet: an output and the signal are still queued
    assert_eq!(driver.error_detail(), None);
    assert_eq!(driver.read(), Reply::Output(1));
    assert_eq!(driver.error_detail(), None);

    assert_eq!(driver.read(), Reply::Errored);
    assert_eq!(
        driver.error_detail().as_deref(),
        Some("unknown opcode 42 at address 2")
    );
}

/// Memory whose writes fail hard
#[derive(Debug)]
struct PanickingMemory(Vec<i64>);

impl MemoryBus for PanickingMemory {
    fn read(&self, addr: usize) -> i64 {
        self.0.get(addr).copied().unwrap_or(0)
    }

    fn write(&mut self, addr: usize, _value: i64) {
        panic!("write to address {} rejected", addr);
    }
}

#[test]
fn test_worker_panic_reaches_driver_as_errored() {
    // ADD #2, #3 -> [0]
    let machine = Machine::new(PanickingMemory(vec![1101, 2, 3, 0, 99]));
    let driver = machine.start(ChannelConfig::default()).unwrap();

    assert_eq!(driver.read(), Reply::Errored);
    assert_eq!(
        driver.error_detail().as_deref(),
        Some("machine worker panicked")
    );
    assert_eq!(driver.write(1), Err(DriverError::Terminated));
    assert!(matches!(driver.join(), Err(DriverError::WorkerPanicked)));
}

use std::sync::{Arc, Mutex};

use spectro_lib::serial::response::InitStatus;
use spectro_lib::serial::{ConnectionState, MockTransport};
use spectro_lib::{Command, CommandDispatcher, PollStatus, Response, SerialError};

type Log = Arc<Mutex<Vec<Result<Response, String>>>>;

fn recorder() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn send(dispatcher: &mut CommandDispatcher<MockTransport>, command: Command, log: &Log) -> bool {
    let ok = log.clone();
    let err = log.clone();
    dispatcher
        .send(
            command,
            move |response| ok.lock().unwrap().push(Ok(response)),
            move |error| err.lock().unwrap().push(Err(error.to_string())),
        )
        .expect("dispatcher idle")
}

#[test]
fn test_init_acknowledged_on_first_poll() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 7200);
    let log = recorder();

    assert!(send(&mut dispatcher, Command::Init, &log));
    assert_eq!(mock.written(), vec![vec![0x1B, 0x5A]]);

    mock.feed(&[0x4F]);
    assert_eq!(dispatcher.poll(), PollStatus::Completed);
    assert_eq!(
        *log.lock().unwrap(),
        vec![Ok(Response::Init(InitStatus::Ready))]
    );
    assert!(!dispatcher.is_busy());
    assert_eq!(dispatcher.state(), ConnectionState::Connected);
}

#[test]
fn test_three_point_spectrum_transfer() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 10);
    let log = recorder();

    send(&mut dispatcher, Command::SpectrumHeader, &log);
    mock.feed(&[0x00, 0x00, 0x01, 0x90, 0x00, 0x03, 0x00]);
    assert_eq!(dispatcher.poll(), PollStatus::Completed);
    assert_eq!(dispatcher.spectrum_cursor().map(|c| c.total_samples), Some(3));

    for raw in [[0x00, 0x64], [0xFF, 0xCE], [0x00, 0x00]] {
        send(&mut dispatcher, Command::SpectrumSample, &log);
        mock.feed(&raw);
        assert_eq!(dispatcher.poll(), PollStatus::Completed);
    }

    let log = log.lock().unwrap();
    assert_eq!(
        log[0],
        Ok(Response::SpectrumHeader {
            start_wavelength: 400,
            sample_count: 3
        })
    );
    let samples: Vec<_> = log[1..]
        .iter()
        .map(|entry| match entry {
            Ok(Response::SpectrumSample(sample)) => *sample,
            other => panic!("expected a sample, got {:?}", other),
        })
        .collect();

    let points: Vec<_> = samples
        .iter()
        .map(|s| (s.point.wavelength, s.point.absorbance))
        .collect();
    assert_eq!(points, vec![(400, 0.01), (401, -0.005), (402, 0.0)]);
    assert_eq!(
        samples.iter().map(|s| s.is_last()).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    assert!(dispatcher.spectrum_cursor().is_none());

    // the sample read itself sends nothing
    assert_eq!(mock.written(), vec![vec![0x1B, 0x35]]);
}

#[test]
fn test_set_wavelength_frame() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 10);
    let log = recorder();

    send(
        &mut dispatcher,
        Command::SetWavelength {
            wavelength: 450,
            gain: 200,
        },
        &log,
    );
    assert_eq!(
        mock.written(),
        vec![vec![0x1B, 0x31, 0x01, 0xC2, 0x00, 0x00, 0xC8]]
    );
}

#[test]
fn test_timeout_fires_on_last_tick_and_disconnects() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 4);
    let log = recorder();

    send(&mut dispatcher, Command::Autotest, &log);
    for remaining in (1..4).rev() {
        assert_eq!(
            dispatcher.poll(),
            PollStatus::Waiting {
                attempts_remaining: remaining
            }
        );
        assert!(log.lock().unwrap().is_empty());
    }
    assert_eq!(dispatcher.poll(), PollStatus::Failed);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert!(matches!(&log[0], Err(msg) if msg.contains("4 polls")));
    assert_eq!(dispatcher.state(), ConnectionState::Disconnected);
    assert_eq!(dispatcher.poll(), PollStatus::Idle);
}

#[test]
fn test_second_command_rejected_while_busy() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 10);
    let log = recorder();

    send(&mut dispatcher, Command::Firmware, &log);
    let busy = dispatcher.send(Command::Model, |_| {}, |_| {});
    assert!(matches!(busy, Err(SerialError::Busy)));
    assert_eq!(mock.written().len(), 1);

    mock.feed(&[0x00, 0x07]);
    assert_eq!(dispatcher.poll(), PollStatus::Completed);
    assert_eq!(*log.lock().unwrap(), vec![Ok(Response::Firmware(7))]);
}

#[test]
fn test_unplugged_device_fails_pending_command() {
    let mock = MockTransport::connected();
    let mut dispatcher = CommandDispatcher::new(mock.clone(), 10);
    let log = recorder();

    send(&mut dispatcher, Command::Model, &log);
    mock.fail_reads(true);
    assert_eq!(dispatcher.poll(), PollStatus::Failed);
    assert!(matches!(&log.lock().unwrap()[0], Err(_)));
    assert_eq!(dispatcher.state(), ConnectionState::Disconnected);

    // nothing is sent while the link is down
    assert!(!send(&mut dispatcher, Command::Init, &log));
    assert_eq!(mock.written().len(), 1);
}

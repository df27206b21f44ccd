use std::io::{Cursor, Write as _};

use proptest::prelude::*;
use waba_contracts::STATUS_ENTRY_FAILED;
use waba_host_runner::{
    EchoEngine, Engine, EngineCall, EngineOp, HostError, HostSession, RegionHandle, StatusCode,
};
use waba_image::MemoryEntrySource;
use waba_runner_common::config::HostConfig;

fn jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        let opts = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        w.start_file(*name, opts).expect("start file");
        w.write_all(bytes).expect("write entry");
    }
    w.finish().expect("finish zip").into_inner()
}

fn echo_session(io_buffer_size: usize) -> HostSession<EchoEngine> {
    HostSession::new(EchoEngine::new(), HostConfig { io_buffer_size })
}

/// Engine whose calls fail with a fixed status.
#[derive(Default)]
struct Refusing {
    fail_set_image: Option<i32>,
    fail_set_io_buffer: Option<i32>,
    fail_invoke: Option<i32>,
    io_installs: usize,
}

impl Engine for Refusing {
    fn set_image(&mut self, _image: &[u8]) -> StatusCode {
        StatusCode(self.fail_set_image.unwrap_or(0))
    }

    fn set_io_buffer(&mut self, _region: RegionHandle) -> StatusCode {
        self.io_installs += 1;
        StatusCode(self.fail_set_io_buffer.unwrap_or(0))
    }

    fn invoke_static_entry(&mut self, _class: &str, _arg: &str, _io: &mut [u8]) -> StatusCode {
        StatusCode(self.fail_invoke.unwrap_or(0))
    }
}

#[test]
fn load_then_invoke_round_trips_parameters() {
    let archive = jar(&[("Main.class", &[0xCA, 0xFE]), ("util/Helper.class", &[1])]);
    let mut session = echo_session(1024);

    let names = session
        .load_archive(Some(archive.as_slice()))
        .expect("load archive");
    assert_eq!(names, ["Main", "util/Helper"]);
    assert_eq!(session.class_names(), names.as_slice());

    let inv = session
        .invoke("Main", "5,7", &["5", "7"])
        .expect("invoke Main");
    assert_eq!(inv.status, StatusCode::OK);
    assert_eq!(inv.outputs, ["5", "7"]);
    assert_eq!(inv.input_summary.count, 2);
    assert_eq!(inv.input_summary.bytes_used, 5);
    assert_eq!(inv.input_summary.truncated, 0);

    let calls = session.engine().calls();
    let image_len = session.image_bytes().len();
    assert_eq!(calls[0], EngineCall::SetImage { len: image_len });
    assert_eq!(image_len, 38);
    assert!(matches!(calls[1], EngineCall::SetIoBuffer(h) if h.capacity == 1024));
    assert_eq!(
        calls[2],
        EngineCall::Invoke {
            class_name: "Main".to_string(),
            arg: "5,7".to_string()
        }
    );
}

#[test]
fn engine_sees_exact_image_bytes() {
    let archive = jar(&[("A.class", &[1, 2, 3]), ("B.class", &[9])]);
    let mut session = echo_session(1024);
    session.load_archive(Some(archive.as_slice())).expect("load");
    assert_eq!(
        session.engine().image(),
        [
            0x00, 0x00, 0x00, 0x0A, 0x00, 0x01, b'A', 0x00, 0x00, 0x00, 0x03, 0x01, 0x02, 0x03,
            0x00, 0x00, 0x00, 0x08, 0x00, 0x01, b'B', 0x00, 0x00, 0x00, 0x01, 0x09,
        ]
    );
}

#[test]
fn no_archive_and_classless_archive_look_the_same() {
    let mut a = echo_session(1024);
    let mut b = echo_session(1024);
    let names_a = a.load_archive(None).expect("no archive");
    let names_b = b
        .load_archive(Some(jar(&[("readme.txt", b"hi")]).as_slice()))
        .expect("classless archive");
    assert!(names_a.is_empty());
    assert!(names_b.is_empty());
    assert_eq!(a.engine().calls(), b.engine().calls());
    assert_eq!(a.engine().calls(), [EngineCall::SetImage { len: 0 }]);
}

#[test]
fn reloading_replaces_previous_image() {
    let mut session = echo_session(1024);
    session
        .load_archive(Some(jar(&[("Old.class", &[1])]).as_slice()))
        .expect("first load");
    session
        .load_archive(Some(jar(&[("New.class", &[2, 2])]).as_slice()))
        .expect("second load");

    assert_eq!(session.class_names(), ["New"]);
    let err = session.invoke::<&str>("Old", "", &[]).unwrap_err();
    assert!(matches!(
        err,
        HostError::Engine {
            op: EngineOp::InvokeStaticEntry,
            status: StatusCode(STATUS_ENTRY_FAILED)
        }
    ));
    session.invoke::<&str>("New", "", &[]).expect("invoke New");
}

#[test]
fn failed_build_keeps_loaded_classes() {
    let mut session = echo_session(1024);
    session
        .load_archive(Some(jar(&[("Keep.class", &[7])]).as_slice()))
        .expect("load");
    let err = session
        .load_archive(Some(&b"not a zip archive"[..]))
        .unwrap_err();
    assert!(matches!(err, HostError::Image(_)));
    assert_eq!(session.class_names(), ["Keep"]);
    session.invoke::<&str>("Keep", "", &[]).expect("still invokable");
}

#[test]
fn load_entries_accepts_any_source() {
    let mut session = echo_session(1024);
    let mut source = MemoryEntrySource::new(Vec::new());
    source.push("a/B.class", vec![1, 2]);
    source.push("a/B.java", b"class B {}".to_vec());
    let names = session.load_entries(&mut source).expect("load entries");
    assert_eq!(names, ["a/B"]);
}

#[test]
fn io_buffer_is_installed_once_across_invocations() {
    let mut session = echo_session(256);
    session
        .load_archive(Some(jar(&[("Main.class", &[0])]).as_slice()))
        .expect("load");
    let first = session.ensure_buffer().expect("buffer");
    for i in 0..5 {
        let arg = i.to_string();
        let inv = session.invoke("Main", &arg, &[arg.as_str()]).expect("invoke");
        assert_eq!(inv.outputs, [arg]);
    }
    assert_eq!(session.ensure_buffer().expect("buffer"), first);
    let installs = session
        .engine()
        .calls()
        .iter()
        .filter(|c| matches!(c, EngineCall::SetIoBuffer(_)))
        .count();
    assert_eq!(installs, 1);
}

#[test]
fn oversized_parameters_are_truncated_not_rejected() {
    let mut session = echo_session(16);
    session
        .load_archive(Some(jar(&[("Main.class", &[0])]).as_slice()))
        .expect("load");
    let long = "x".repeat(40);
    let inv = session
        .invoke("Main", "", &[long.as_str()])
        .expect("invoke");
    assert_eq!(inv.input_summary.truncated, 1);
    assert_eq!(inv.input_summary.bytes_used, 16);
    assert_eq!(inv.outputs, ["x".repeat(14)]);
}

#[test]
fn too_many_parameters_is_an_error() {
    let mut session = echo_session(1024);
    session
        .load_archive(Some(jar(&[("Main.class", &[0])]).as_slice()))
        .expect("load");
    let params = vec!["p"; 256];
    let err = session.invoke("Main", "", &params).unwrap_err();
    assert!(matches!(err, HostError::Params(_)), "{err}");
}

#[test]
fn missing_class_name_is_rejected_before_any_engine_call() {
    let mut session = echo_session(1024);
    let err = session.invoke::<&str>("", "", &[]).unwrap_err();
    assert!(matches!(err, HostError::MissingClassName));
    assert!(session.engine().calls().is_empty());
}

#[test]
fn non_zero_statuses_become_errors() {
    let mut session = HostSession::new(
        Refusing {
            fail_set_image: Some(3),
            ..Refusing::default()
        },
        HostConfig::default(),
    );
    let err = session.load_archive(None).unwrap_err();
    assert_eq!(err.to_string(), "engine set_image failed with status 3");
    assert!(session.class_names().is_empty());

    let mut session = HostSession::new(
        Refusing {
            fail_invoke: Some(-1),
            ..Refusing::default()
        },
        HostConfig::default(),
    );
    let err = session.invoke("Main", "", &["keep"]).unwrap_err();
    assert!(matches!(
        err,
        HostError::Engine {
            op: EngineOp::InvokeStaticEntry,
            status: StatusCode(-1)
        }
    ));
}

#[test]
fn refused_image_is_not_kept() {
    let archive = jar(&[("Main.class", &[0xCA, 0xFE])]);
    let mut session = HostSession::new(Refusing::default(), HostConfig::default());
    session
        .load_archive(Some(archive.as_slice()))
        .expect("first load");
    assert_eq!(session.image_bytes().len(), 4 + 2 + 4 + 4 + 2);

    session.engine_mut().fail_set_image = Some(7);
    let err = session.load_archive(Some(archive.as_slice())).unwrap_err();
    assert!(matches!(
        err,
        HostError::Engine {
            op: EngineOp::SetImage,
            status: StatusCode(7)
        }
    ));
    assert!(session.image_bytes().is_empty());
    assert!(session.class_names().is_empty());
}

#[test]
fn failed_io_install_is_retried() {
    let mut session = HostSession::new(
        Refusing {
            fail_set_io_buffer: Some(5),
            ..Refusing::default()
        },
        HostConfig::default(),
    );
    assert!(session.ensure_buffer().is_err());
    assert!(session.io_bytes().is_none());

    session.engine_mut().fail_set_io_buffer = None;
    session.ensure_buffer().expect("second attempt");
    session.ensure_buffer().expect("already installed");
    assert_eq!(session.engine().io_installs, 2);
}

proptest! {
    #[test]
    fn echo_returns_every_parameter_that_fits(
        params in prop::collection::vec("[a-zA-Z0-9 ]{0,12}", 0..40),
    ) {
        let mut session = echo_session(1024);
        session
            .load_entries(&mut MemoryEntrySource::new(vec![("Main.class".to_string(), vec![0])]))
            .expect("load");
        let inv = session.invoke("Main", "", &params).expect("invoke");
        prop_assert_eq!(inv.input_summary.truncated, 0);
        prop_assert_eq!(inv.outputs, params);
    }
}

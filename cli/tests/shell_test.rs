use std::sync::Arc;

use cli::shell::{execute, parse, render_bytes, ParseError, ShellCommand};
use encdev::control::{IOCTL_OP_ENCRYPT, IOCTL_OP_REWIND, IOCTL_OP_SETKEY};
use encdev::{DeviceConfig, DeviceHost, Handle, IdGen, Minor};

#[test]
fn test_parse_open() {
    assert_eq!(parse("open 3"), Ok(ShellCommand::Open(Minor::new(3))));
}

#[test]
fn test_parse_write_keeps_spaces() {
    assert_eq!(
        parse("write 2 hello world"),
        Ok(ShellCommand::Write {
            fd: Handle::new(2),
            data: b"hello world".to_vec(),
        })
    );
}

#[test]
fn test_parse_shortcuts() {
    assert_eq!(
        parse("key 2 0x5A"),
        Ok(ShellCommand::Ioctl {
            fd: Handle::new(2),
            code: IOCTL_OP_SETKEY,
            param: 0x5A,
        })
    );
    assert_eq!(
        parse("cipher 2 1"),
        Ok(ShellCommand::Ioctl {
            fd: Handle::new(2),
            code: IOCTL_OP_ENCRYPT,
            param: 1,
        })
    );
    assert_eq!(
        parse("rewind 2"),
        Ok(ShellCommand::Ioctl {
            fd: Handle::new(2),
            code: IOCTL_OP_REWIND,
            param: 0,
        })
    );
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse("   "), Err(ParseError::Empty));
    assert_eq!(
        parse("frobnicate 1"),
        Err(ParseError::UnknownCommand("frobnicate".to_string()))
    );
    assert!(matches!(parse("read 1"), Err(ParseError::BadArgument(_))));
    assert!(matches!(parse("open x"), Err(ParseError::BadArgument(_))));
    assert!(matches!(parse("write"), Err(ParseError::BadArgument(_))));
}

#[test]
fn test_parse_quit() {
    assert_eq!(parse("quit"), Ok(ShellCommand::Quit));
}

#[test]
fn test_render_bytes_escapes() {
    assert_eq!(render_bytes(b"hi\n\xf0"), "hi\\n\\xf0");
}

#[tokio::test]
async fn test_execute_session() {
    let host = DeviceHost::register(
        DeviceConfig::with_capacity(16).unwrap(),
        Arc::new(IdGen::new()),
    )
    .unwrap();
    let client = host.client();
    let runner = tokio::spawn(host.run());

    let opened = execute(&client, &parse("open 1").unwrap()).await.unwrap();
    let fd: i64 = opened.trim_start_matches("fd ").parse().unwrap();

    let out = execute(&client, &parse(&format!("write {fd} HELLO")).unwrap())
        .await
        .unwrap();
    assert_eq!(out, "5 bytes written");

    execute(&client, &parse(&format!("rewind {fd}")).unwrap())
        .await
        .unwrap();
    let out = execute(&client, &parse(&format!("read {fd} 5")).unwrap())
        .await
        .unwrap();
    assert_eq!(out, "5 bytes: HELLO");

    let err = execute(&client, &parse(&format!("cipher {fd} 2")).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.errno(), encdev::error::EINVAL);

    drop(client);
    runner.await.unwrap();
}

//! The host-facing plugin surface over real bindings.
#![cfg(all(feature = "native", feature = "image-rs"))]

mod support;

use support::{TempDir, noise};
use zenadapters::probe::read_header;
use zenadapters::{Components, ImageAdapter, ImageRsAdapter, NativeAdapter, Plugin};

fn check_plugin<A: ImageAdapter>(plugin: Plugin<A>, dir: &TempDir) {
    let name = plugin.adapter().name();
    let pixels = noise(9, 7, Components::Rgba, 42);
    let path = dir.join(&format!("{name}.png"));

    assert!(plugin.save(&path, &pixels, 9, 7, 4, "png"), "{name}");
    assert_eq!(plugin.last_error(), None);

    let header = read_header(&path).unwrap();
    assert!(plugin.identify(&path, &header));
    let image = plugin.load(&path).unwrap();
    assert_eq!(image.pixels(), &pixels[..]);

    // failing load fills the slot
    assert!(plugin.load(&dir.join("missing.png")).is_none());
    let mut buf = [0u8; 256];
    let n = plugin.error(&mut buf);
    assert!(n > 0, "{name}");
    let message = std::str::from_utf8(&buf[..n]).unwrap().to_string();
    assert!(message.contains("missing.png"), "{message}");

    // success does not clear it, identify does not touch it
    assert!(plugin.load(&path).is_some());
    assert!(!plugin.identify(&dir.join("x.txt"), b"hello there, not an image"));
    assert_eq!(plugin.last_error().as_deref(), Some(message.as_str()));

    // truncated copy
    let mut small = [0u8; 5];
    assert_eq!(plugin.error(&mut small), 5);
    assert_eq!(&small, &message.as_bytes()[..5]);

    // a new failure overwrites
    assert!(!plugin.save(&dir.join("bad.png"), &pixels, -9, 7, 4, "png"));
    assert_ne!(plugin.last_error().as_deref(), Some(message.as_str()));
    assert!(!plugin.save(&dir.join("short.png"), &pixels[1..], 9, 7, 4, "png"));
    assert!(plugin.last_error().unwrap().contains("expected"));
    assert!(!dir.join("short.png").exists());

    // streaming through handles
    let session = plugin.open(&path).unwrap();
    assert_eq!(
        (session.width, session.height, session.components),
        (9, 7, Components::Rgba)
    );
    let mut row = [0u8; 36];
    for y in 0..7u32 {
        assert!(plugin.read_line(session.handle, y, &mut row));
        assert_eq!(&row[..], image.row(y).unwrap());
    }
    assert!(!plugin.read_line(session.handle, 7, &mut row));
    assert!(plugin.last_error().unwrap().contains("out of range"));
    assert!(plugin.read_line(session.handle, 0, &mut row));

    plugin.close(session.handle);
    assert_eq!(plugin.open_sessions(), 0);
    assert!(!plugin.read_line(session.handle, 0, &mut row));
    plugin.close(session.handle);

    assert!(plugin.open(&dir.join("missing.png")).is_none());
    assert_eq!(plugin.open_sessions(), 0);

    let savers = plugin.get_savers();
    assert!(!savers.is_empty());
    assert_eq!(savers, plugin.get_savers());
}

#[test]
fn native_plugin_contract() {
    let dir = TempDir::new("plugin-native");
    check_plugin(Plugin::new(NativeAdapter::new()), &dir);
}

#[test]
fn image_rs_plugin_contract() {
    let dir = TempDir::new("plugin-image-rs");
    check_plugin(Plugin::new(ImageRsAdapter::new()), &dir);
}

#[test]
fn sessions_from_many_threads() {
    let dir = TempDir::new("plugin-threads");
    let plugin = Plugin::new(NativeAdapter::new());
    let pixels = noise(16, 16, Components::Gray, 5);
    let path = dir.join("shared.png");
    assert!(plugin.save(&path, &pixels, 16, 16, 1, "png"));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let session = plugin.open(&path).unwrap();
                let mut row = [0u8; 16];
                for y in (0..16u32).rev() {
                    assert!(plugin.read_line(session.handle, y, &mut row));
                    assert_eq!(&row[..], &pixels[y as usize * 16..][..16]);
                }
                plugin.close(session.handle);
            });
        }
    });
    assert_eq!(plugin.open_sessions(), 0);
}

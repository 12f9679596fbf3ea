//! Win32 keyboard injection via `SendInput`

use super::{DesktopError, Key};
use std::mem;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL, VK_ESCAPE, VK_MENU, VK_RETURN, VK_SHIFT, VK_TAB,
};

fn virtual_key(key: Key) -> VIRTUAL_KEY {
    match key {
        Key::Ctrl => VK_CONTROL,
        Key::Shift => VK_SHIFT,
        Key::Alt => VK_MENU,
        Key::Enter => VK_RETURN,
        Key::Escape => VK_ESCAPE,
        Key::Tab => VK_TAB,
        // VK codes for letters and digits are their uppercase ASCII values
        Key::Char(c) => VIRTUAL_KEY(c.to_ascii_uppercase() as u16),
    }
}

/// Send one key-down or key-up event to the foreground window
pub(super) fn send_key(key: Key, up: bool) -> Result<(), DesktopError> {
    let flags = if up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };

    let inputs = [INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: virtual_key(key),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }];

    // SAFETY: `inputs` is a fully initialised INPUT array and cbsize matches its element size.
    let sent = unsafe { SendInput(&inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(DesktopError::Input(format!(
            "SendInput blocked {} {}",
            key,
            if up { "release" } else { "press" }
        )))
    }
}

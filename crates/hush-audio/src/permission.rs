//! Microphone authorization through `AVCaptureDevice`.

use block2::RcBlock;
use hush_core::permission::AccessCallback;
use hush_core::{MicPermission, PermissionProvider};
use objc2::runtime::Bool;
use objc2::{class, msg_send};
use objc2_foundation::NSString;
use parking_lot::Mutex;
use tracing::debug;

#[link(name = "AVFoundation", kind = "framework")]
unsafe extern "C" {}

/// Value of `AVMediaTypeAudio`.
const MEDIA_TYPE_AUDIO: &str = "soun";

#[derive(Debug, Default, Clone, Copy)]
pub struct AvPermissions;

impl PermissionProvider for AvPermissions {
    fn status(&self) -> MicPermission {
        let media_type = NSString::from_str(MEDIA_TYPE_AUDIO);
        let status: isize = unsafe {
            msg_send![
                class!(AVCaptureDevice),
                authorizationStatusForMediaType: &*media_type
            ]
        };
        debug!(status, "AVAuthorizationStatus");
        MicPermission::from_raw(status)
    }

    fn request_access(&self, on_complete: AccessCallback) {
        let media_type = NSString::from_str(MEDIA_TYPE_AUDIO);
        // The block type is `Fn`, the callback is only ever run once.
        let on_complete = Mutex::new(Some(on_complete));
        let handler = RcBlock::new(move |granted: Bool| {
            if let Some(callback) = on_complete.lock().take() {
                callback(granted.as_bool());
            }
        });
        unsafe {
            let _: () = msg_send![
                class!(AVCaptureDevice),
                requestAccessForMediaType: &*media_type,
                completionHandler: &*handler
            ];
        }
    }
}

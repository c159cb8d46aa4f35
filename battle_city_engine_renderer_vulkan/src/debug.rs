/// Vulkan Debug Messenger - forwards validation layer messages to the engine logger

use ash::vk;
use battle_city_engine::{engine_debug, engine_error, engine_trace, engine_warn};
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};

const SOURCE: &str = "battle_city::vulkan::validation";

static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);
static VALIDATION_WARNINGS: AtomicU32 = AtomicU32::new(0);

/// Errors and warnings reported by the validation layers since startup
pub fn validation_message_counts() -> (u32, u32) {
    (
        VALIDATION_ERRORS.load(Ordering::Relaxed),
        VALIDATION_WARNINGS.load(Ordering::Relaxed),
    )
}

pub(crate) fn messenger_create_info<'a>() -> vk::DebugUtilsMessengerCreateInfoEXT<'a> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback))
}

fn message_type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Called by the validation layers; never aborts the call that triggered it
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;

    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let kind = message_type_label(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_ERRORS.fetch_add(1, Ordering::Relaxed);
        engine_error!(SOURCE, "[{}] {}: {}", kind, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        VALIDATION_WARNINGS.fetch_add(1, Ordering::Relaxed);
        engine_warn!(SOURCE, "[{}] {}: {}", kind, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        engine_debug!(SOURCE, "[{}] {}: {}", kind, message_id_name, message);
    } else {
        engine_trace!(SOURCE, "[{}] {}: {}", kind, message_id_name, message);
    }

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;

use notify_rust::Notification;

pub trait Notifier {
    /// Fire-and-forget; implementations swallow their own failures.
    fn notify(&self, title: &str, body: &str);
}

/// Desktop notifications through the OS notification service.
pub struct DesktopNotifier {
    appname: String,
}

impl DesktopNotifier {
    pub fn new(appname: impl Into<String>) -> Self {
        Self { appname: appname.into() }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let shown = Notification::new()
            .summary(title)
            .body(body)
            .appname(&self.appname)
            .icon("alarm-clock")
            .show();
        if let Err(e) = shown {
            log::warn!("Notification '{}' failed: {}", title, e);
        }
    }
}

/// Used with `--no-notify`.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, title: &str, _body: &str) {
        log::debug!("Notification suppressed: {}", title);
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}

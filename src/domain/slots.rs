//! The fixed view-slot axis: (platform × view × role) coordinates.
//!
//! Every tracked object carries the same grid of view slots. Coordinates
//! are typed so pages and summaries address slots directly instead of
//! re-deriving dotted keys from strings; the dotted form is produced from
//! the coordinates, never parsed back.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Desktop,
    Mobile,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Grid,
    Details,
    Infocard,
    Spotlight,
    Settings,
    List,
}

impl ViewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Details => "details",
            Self::Infocard => "infocard",
            Self::Spotlight => "spotlight",
            Self::Settings => "settings",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Vendor,
    Operations,
    Client,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Vendor, Role::Operations, Role::Client];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Operations => "operations",
            Self::Client => "client",
        }
    }
}

/// One fixed slot coordinate. The state diagram is the only renderable
/// reference outside this axis and is addressed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedSlot {
    pub platform: Platform,
    pub view: ViewKind,
    pub role: Role,
}

/// Dotted key of the standalone state-diagram record.
pub const STATE_DIAGRAM_KEY: &str = "state-diagram";

/// Views available per platform, in construction order.
pub const DESKTOP_VIEWS: [ViewKind; 5] = [
    ViewKind::Grid,
    ViewKind::Details,
    ViewKind::Infocard,
    ViewKind::Spotlight,
    ViewKind::Settings,
];
pub const MOBILE_VIEWS: [ViewKind; 2] = [ViewKind::List, ViewKind::Details];

impl FixedSlot {
    pub const COUNT: usize = (DESKTOP_VIEWS.len() + MOBILE_VIEWS.len()) * Role::ALL.len();

    pub const fn new(platform: Platform, view: ViewKind, role: Role) -> Self {
        Self {
            platform,
            view,
            role,
        }
    }

    /// The slot's unique dotted key, derived from its coordinates.
    pub fn key(self) -> String {
        format!(
            "{}.{}.{}",
            self.platform.as_str(),
            self.view.as_str(),
            self.role.as_str()
        )
    }

    /// Every fixed slot in construction order: desktop views first, then
    /// mobile views, roles cycling fastest.
    pub fn all() -> impl Iterator<Item = FixedSlot> {
        let desktop = DESKTOP_VIEWS
            .into_iter()
            .map(|view| (Platform::Desktop, view));
        let mobile = MOBILE_VIEWS.into_iter().map(|view| (Platform::Mobile, view));
        desktop.chain(mobile).flat_map(|(platform, view)| {
            Role::ALL
                .into_iter()
                .map(move |role| FixedSlot::new(platform, view, role))
        })
    }

    /// Stable dense index into per-descriptor slot tables.
    pub fn ordinal(self) -> usize {
        let (views, base): (&[ViewKind], usize) = match self.platform {
            Platform::Desktop => (&DESKTOP_VIEWS, 0),
            Platform::Mobile => (&MOBILE_VIEWS, DESKTOP_VIEWS.len() * Role::ALL.len()),
        };
        let view_index = views
            .iter()
            .position(|view| *view == self.view)
            .unwrap_or_default();
        let role_index = match self.role {
            Role::Vendor => 0,
            Role::Operations => 1,
            Role::Client => 2,
        };
        base + view_index * Role::ALL.len() + role_index
    }
}

impl fmt::Display for FixedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

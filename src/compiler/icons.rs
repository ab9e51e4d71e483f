//! Fixed icon set exposed to generated components, both as top-level
//! bindings (`<Star />`) and through the `Lucide` namespace object.
//!
//! The sandbox prelude draws each icon as an empty outline `<svg>` carrying
//! the icon name; the preview only needs size and placement, not the glyph
//! paths.

pub const ICON_NAMES: &[&str] = &[
    "Activity", "AlertCircle", "AlertTriangle", "Archive", "ArrowDown", "ArrowLeft",
    "ArrowRight", "ArrowUp", "ArrowUpRight", "Award", "BarChart", "BarChart2", "BarChart3",
    "Battery", "Bell", "Book", "BookOpen", "Bookmark", "Box", "Briefcase", "Building",
    "Calendar", "Camera", "Check", "CheckCircle", "CheckCircle2", "ChevronDown", "ChevronLeft",
    "ChevronRight", "ChevronUp", "Circle", "Clock", "Cloud", "Code", "Coffee", "Copy", "Cpu",
    "CreditCard", "Crown", "Database", "DollarSign", "Download", "Edit", "ExternalLink", "Eye",
    "EyeOff", "File", "FileText", "Filter", "Flag", "Flame", "Folder", "Gamepad", "Gamepad2",
    "Gift", "Globe", "Grid", "Hash", "Heart", "Home", "Image", "Info", "Layers", "LayoutGrid",
    "Link", "List", "Loader", "Loader2", "Lock", "Mail", "MapPin", "Maximize", "Menu",
    "MessageCircle", "MessageSquare", "Minus", "Monitor", "Moon", "MoreHorizontal",
    "MoreVertical", "Music", "Package", "Pencil", "Percent", "Phone", "PieChart", "Play", "Plus",
    "RefreshCw", "Save", "Search", "Send", "Server", "Settings", "Share", "Share2", "Shield",
    "ShieldCheck", "ShoppingBag", "ShoppingCart", "Sparkles", "Star", "Sun", "Swords", "Tag",
    "Target", "Terminal", "ThumbsUp", "Timer", "Trash", "Trash2", "TrendingDown", "TrendingUp",
    "Trophy", "Truck", "Tv", "Type", "Unlock", "Upload", "User", "UserCheck", "UserPlus",
    "Users", "Video", "Wallet", "Wifi", "X", "XCircle", "Zap", "ZoomIn",
];

/// `BarChart3` -> `bar-chart-3`
pub fn kebab_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = prev {
            let boundary = (c.is_ascii_uppercase() && !p.is_ascii_uppercase())
                || (c.is_ascii_digit() && !p.is_ascii_digit());
            if boundary {
                out.push('-');
            }
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_names_follow_icon_css_classes() {
        assert_eq!(kebab_name("BarChart3"), "bar-chart-3");
        assert_eq!(kebab_name("Gamepad2"), "gamepad-2");
        assert_eq!(kebab_name("X"), "x");
        assert_eq!(kebab_name("AlertTriangle"), "alert-triangle");
    }

    #[test]
    fn icon_names_are_unique() {
        let mut names = ICON_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ICON_NAMES.len());
    }
}

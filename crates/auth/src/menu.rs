//! Navigation menu tree delivered by `/menus`.

use serde::{Deserialize, Serialize};

use crate::Permission;

/// A node of the console's side menu.
///
/// The backend prunes the tree to what the user may see; leaves carry the
/// permission code that unlocks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    /// Depth-first search by menu code.
    pub fn find(&self, code: &str) -> Option<&MenuNode> {
        if self.code == code {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(code))
    }
}

/// Depth-first search of a menu forest by code.
pub fn find_menu<'a>(menus: &'a [MenuNode], code: &str) -> Option<&'a MenuNode> {
    menus.iter().find_map(|m| m.find(code))
}

/// Collect every path reachable in a menu forest, in display order.
pub fn menu_paths(menus: &[MenuNode]) -> Vec<&str> {
    fn walk<'a>(nodes: &'a [MenuNode], out: &mut Vec<&'a str>) {
        for node in nodes {
            if let Some(path) = node.path.as_deref() {
                out.push(path);
            }
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(menus, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<MenuNode> {
        serde_json::from_str(
            r#"[
                {"name":"Overview","code":"overview","path":"/overview"},
                {"name":"RBAC","code":"rbac","children":[
                    {"name":"Users","code":"rbac:user:read","path":"/rbac/user","permission":"rbac:user:read"}
                ]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn paths_are_collected_depth_first() {
        let menus = tree();
        assert_eq!(menu_paths(&menus), vec!["/overview", "/rbac/user"]);
    }

    #[test]
    fn find_descends_into_children() {
        let menus = tree();
        let users = menus[1].find("rbac:user:read").unwrap();
        assert!(users.children.is_empty());
        assert_eq!(users.permission, Some(Permission::from_static("rbac:user:read")));
        assert!(menus[0].find("rbac").is_none());
        assert_eq!(find_menu(&menus, "rbac").map(|m| m.children.len()), Some(1));
        assert!(find_menu(&menus, "tasklog").is_none());
    }
}

//! Maven POM documents and their XML rendering.

use crate::maven::MavenCoordinate;

/// A license entry of a POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct License {
    pub name: String,
    pub url: String,
}

/// Source control information of a POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scm {
    pub connection: String,
    pub developer_connection: String,
    pub url: String,
}

/// A developer entry of a POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Developer {
    pub name: String,
    pub email: String,
    pub organization: String,
    pub organization_url: String,
}

/// A Project Object Model describing one published artifact.
///
/// Text fields are rendered verbatim, so an empty `name` produces an empty
/// `<name></name>` element rather than dropping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pom {
    pub coordinate: MavenCoordinate,
    pub name: String,
    pub description: String,
    pub url: String,
    pub licenses: Vec<License>,
    pub scm: Scm,
    pub developers: Vec<Developer>,
}

impl Pom {
    /// A POM with only its coordinate set.
    pub fn new(coordinate: MavenCoordinate) -> Self {
        Self {
            coordinate,
            name: String::new(),
            description: String::new(),
            url: String::new(),
            licenses: Vec::new(),
            scm: Scm::default(),
            developers: Vec::new(),
        }
    }

    /// Render the POM as a Maven 4.0.0 XML document.
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::default();
        w.line(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        w.line(
            r#"<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd">"#,
        );
        w.indent += 1;
        w.element("modelVersion", "4.0.0");
        w.element("groupId", &self.coordinate.group_id);
        w.element("artifactId", &self.coordinate.artifact_id);
        w.element("version", &self.coordinate.version);
        w.element("name", &self.name);
        w.element("description", &self.description);
        w.element("url", &self.url);

        w.open("licenses");
        for license in &self.licenses {
            w.open("license");
            w.element("name", &license.name);
            w.element("url", &license.url);
            w.close("license");
        }
        w.close("licenses");

        w.open("scm");
        w.element("connection", &self.scm.connection);
        w.element("developerConnection", &self.scm.developer_connection);
        w.element("url", &self.scm.url);
        w.close("scm");

        w.open("developers");
        for dev in &self.developers {
            w.open("developer");
            w.element("name", &dev.name);
            w.element("email", &dev.email);
            w.element("organization", &dev.organization);
            w.element("organizationUrl", &dev.organization_url);
            w.close("developer");
        }
        w.close("developers");

        w.indent -= 1;
        w.line("</project>");
        w.out
    }
}

#[derive(Default)]
struct XmlWriter {
    out: String,
    indent: usize,
}

impl XmlWriter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, tag: &str) {
        self.line(&format!("<{tag}>"));
        self.indent += 1;
    }

    fn close(&mut self, tag: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("</{tag}>"));
    }

    fn element(&mut self, tag: &str, text: &str) {
        self.line(&format!("<{tag}>{}</{tag}>", escape(text)));
    }
}

/// Escape the five XML special characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

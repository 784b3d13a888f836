/// A named request-target fed to the benchmarks.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    target: &'static str,
}

impl TestCase {
    pub const fn new(name: &'static str, group: TestGroup, target: &'static str) -> Self {
        Self { name, group, target }
    }

    pub const fn plain(name: &'static str, target: &'static str) -> Self {
        Self::new(name, TestGroup::Plain, target)
    }

    pub const fn escaped(name: &'static str, target: &'static str) -> Self {
        Self::new(name, TestGroup::Escaped, target)
    }

    pub const fn dotted(name: &'static str, target: &'static str) -> Self {
        Self::new(name, TestGroup::Dotted, target)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn target(&self) -> &'static str {
        self.target
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    /// Nothing to rewrite.
    Plain,
    /// Percent escapes to validate and re-case.
    Escaped,
    /// Dot segments and repeated slashes.
    Dotted,
}

pub const TARGETS: [TestCase; 4] = [
    TestCase::plain("plain_short", "/index.html"),
    TestCase::plain("plain_query", "/static/css/site.min.css?v=20240101&theme=dark"),
    TestCase::escaped("escaped", "/docs/%7euser/a%2db%20c/%E4%BD%A0%e5%a5%bd.html?q=%41%42"),
    TestCase::dotted("dotted", "/a/./b/../../c//d///e/./f/../g.php/extra/path?x=1"),
];

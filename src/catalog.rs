//! Static rule catalog for the forwarder retrofit.
//!
//! Two compiled-in rule sets exist:
//!
//! - [`forwarder_catalog`]: a per-file mapping of known test files to the
//!   exact constructor calls they contain, rewritten literally.
//! - [`glob_rules`]: a shared, file-name-independent rule set applied to
//!   every `*.t.sol` file, covering the import, the state-variable
//!   declaration, the `setUp` deployment, and the first unpatched
//!   constructor call of each contract type.
//!
//! The catalog is built once at startup and passed explicitly to the
//! driver; it is never mutated during a run.

use crate::rule::{InsertAnchor, InsertGuard, InsertRule, PatchRule};
use regex::Regex;

/// Directory the test files live under, relative to the invocation root.
pub const DEFAULT_TEST_DIR: &str = "test";

/// Suffix selecting Foundry test files in glob mode.
pub const TEST_FILE_SUFFIX: &str = ".t.sol";

/// The extra constructor argument every patched call gains.
pub const FORWARDER_ARG: &str = ", address(forwarder)";

/// A single file plus the ordered rule list that applies to it.
#[derive(Debug, Clone)]
pub struct FileTarget {
    /// Filename relative to the base test directory.
    pub file: String,
    pub rules: Vec<PatchRule>,
}

/// Ordered mapping of target files to their rules.
///
/// Absence of an entry means "no rules defined, file untouched".
#[derive(Debug, Clone)]
pub struct PatchCatalog {
    pub targets: Vec<FileTarget>,
}

impl PatchCatalog {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn rules_for(&self, file: &str) -> Option<&[PatchRule]> {
        self.targets
            .iter()
            .find(|t| t.file == file)
            .map(|t| t.rules.as_slice())
    }
}

/// Rewrite a constructor call to carry the forwarder argument.
///
/// `call` must be the full literal call text ending in `)`; the
/// replacement re-opens the argument list and appends the forwarder.
fn forwarded(call: &str) -> PatchRule {
    debug_assert!(call.ends_with(')'));
    let new = format!("{}{})", &call[..call.len() - 1], FORWARDER_ARG);
    PatchRule::literal(call, new)
}

fn target(file: &str, calls: &[&str]) -> FileTarget {
    FileTarget {
        file: file.to_string(),
        rules: calls.iter().map(|call| forwarded(call)).collect(),
    }
}

/// The explicit per-file catalog: every known test file and the exact
/// constructor calls it contains.
pub fn forwarder_catalog() -> PatchCatalog {
    let targets = vec![
        target(
            "DEXPairFeeOnTransfer.t.sol",
            &["new DEXRouter(address(factory), weth)"],
        ),
        target(
            "DEXRouter.t.sol",
            &["new DEXRouter(address(factory), address(weth))"],
        ),
        target(
            "EventEmission.t.sol",
            &["new DexCore(address(this), address(weth))"],
        ),
        target("FeeOnTransferToken.t.sol", &["new DexCore(factory, weth)"]),
        target(
            "FlashLoanFeeDistribution.t.sol",
            &[
                "new DexCore(factory, weth)",
                "new FlashSwap(address(dexCore))",
            ],
        ),
        target(
            "FlashLoanHardening.t.sol",
            &[
                "new DexCore(factory, weth)",
                "new FlashSwap(address(dexCore))",
            ],
        ),
        target(
            "FlashSwap.t.sol",
            &[
                "new DexCore(factory, weth)",
                "new FlashSwap(address(dexCore))",
            ],
        ),
        target(
            "FuzzTests.t.sol",
            &[
                "new DexCore(address(factory), address(weth))",
                "new DEXRouter(address(factory), address(weth))",
            ],
        ),
        target(
            "GasOptimization.t.sol",
            &[
                "new DexCore(address(factory), address(weth))",
                "new DEXRouter(address(factory), address(weth))",
            ],
        ),
        target(
            "GovernanceTimelock.t.sol",
            &[
                "new DexCore(address(factory), address(weth))",
                "new FlashSwap(address(dexCore))",
            ],
        ),
        target(
            "IntegrationTests.t.sol",
            &[
                "new DexCore(address(factory), address(weth))",
                "new DEXRouter(address(factory), address(weth))",
                "new FlashSwap(address(dexCore))",
            ],
        ),
        target("LPToken.t.sol", &["new DexCore(factory, address(weth))"]),
        target(
            "LiquidityFlows.t.sol",
            &["new DexCore(address(factory), address(weth))"],
        ),
        target(
            "LowSeverityFixes.t.sol",
            &[
                "new DexCore(address(this), address(weth))",
                "new FlashSwap(address(dexCore))",
                "new DexCore(address(0), address(weth))",
                "new DexCore(address(this), address(0))",
                "new FlashSwap(address(0))",
            ],
        ),
        target(
            "PermitIntegration.t.sol",
            &["new DexCore(address(factory), address(weth))"],
        ),
        target(
            "ProtocolFeeCap.t.sol",
            &["new DexCore(address(0x1234), address(weth))"],
        ),
        target(
            "RegressionTests.t.sol",
            &[
                "new DexCore(address(factory), address(weth))",
                "new DEXRouter(address(factory), address(dexCore))",
            ],
        ),
        target(
            "SlippageProtection.t.sol",
            &["new DEXRouter(address(factory), address(weth))"],
        ),
        target(
            "SqrtPrecision.t.sol",
            &["new DexCore(address(0x1234), address(weth))"],
        ),
    ];

    PatchCatalog { targets }
}

fn insert(
    locator: &str,
    anchor: InsertAnchor,
    text: &str,
    marker: &str,
    requires: Option<&str>,
) -> PatchRule {
    // Catalog patterns are static; a malformed one is a programmer error.
    PatchRule::Insert(InsertRule {
        locator: Regex::new(locator).expect("catalog locator pattern"),
        anchor,
        text: text.to_string(),
        guard: InsertGuard {
            marker: Regex::new(marker).expect("catalog guard pattern"),
            requires: requires.map(|p| Regex::new(p).expect("catalog guard pattern")),
        },
    })
}

/// Marker detecting a call that already carries the forwarder argument.
/// Tolerates one level of nested parentheses in earlier arguments.
fn patched_call_marker(contract: &str) -> String {
    format!(r"new {contract}\((?:[^()]|\([^)]*\))*address\(forwarder\)")
}

/// Constructor-argument insertion for a two-argument constructor:
/// `new Name(a, b)` becomes `new Name(a, b, address(forwarder))`.
/// Arguments may contain one level of nested parentheses
/// (`address(weth)` and the like).
fn append_forwarder_arg2(contract: &str) -> PatchRule {
    insert(
        &format!(r"new {contract}\((?P<args>(?:[^(),]|\([^)]*\))+,\s*(?:[^()]|\([^)]*\))+)\)"),
        InsertAnchor::GroupEnd("args"),
        FORWARDER_ARG,
        &patched_call_marker(contract),
        None,
    )
}

/// Same for a single-argument constructor.
fn append_forwarder_arg1(contract: &str) -> PatchRule {
    insert(
        &format!(r"new {contract}\((?P<args>(?:[^()]|\([^)]*\))+)\)"),
        InsertAnchor::GroupEnd("args"),
        FORWARDER_ARG,
        &patched_call_marker(contract),
        None,
    )
}

/// The shared rule set applied uniformly to every `*.t.sol` file.
///
/// Order matters: the declaration and deployment rules require the
/// import rule's marker, so a file without imports is left alone
/// entirely.
pub fn glob_rules() -> Vec<PatchRule> {
    vec![
        // Import after the last existing import directive.
        insert(
            r#"(?s)^.*import "[^"]+";"#,
            InsertAnchor::MatchEnd,
            "\nimport \"@openzeppelin/contracts/metatx/MinimalForwarder.sol\";",
            "MinimalForwarder",
            None,
        ),
        // State variable after the first public declaration in the
        // test contract body.
        insert(
            r"(?s)contract\s+\w+\s+is\s+Test\s*\{.*?(?P<decl>\n\s+\w+\s+public\s+\w+;)",
            InsertAnchor::GroupEnd("decl"),
            "\n    MinimalForwarder public forwarder;",
            r"MinimalForwarder\s+public\s+forwarder",
            Some("MinimalForwarder"),
        ),
        // Deployment after the WETH token deployment inside setUp.
        insert(
            r"(?s)function setUp\(\) public \{.*?(?P<deploy>weth = new MockERC20[^;]+;)",
            InsertAnchor::GroupEnd("deploy"),
            "\n        \n        // Deploy MinimalForwarder for EIP-2771 meta-transactions\n        forwarder = new MinimalForwarder();",
            r"forwarder = new MinimalForwarder\(\)",
            Some("MinimalForwarder"),
        ),
        append_forwarder_arg2("DexCore"),
        append_forwarder_arg2("DEXRouter"),
        append_forwarder_arg1("FlashSwap"),
    ]
}

#[test]
fn ui_pass() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/pass/entity_catalog.rs");
    t.pass("tests/ui/pass/entity_minimal.rs");
}

#[test]
#[ignore = "expected stderr snapshots depend on the compiler version"]
fn ui_compile_fail() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/ui/fail/entity_missing_key.rs");
    t.compile_fail("tests/ui/fail/entity_key_not_option.rs");
    t.compile_fail("tests/ui/fail/entity_unknown_attribute.rs");
    t.compile_fail("tests/ui/fail/entity_duplicate_column.rs");
}

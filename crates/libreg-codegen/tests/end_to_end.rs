//! Scan annotated C fixtures with the parser front end and check the
//! generated registration source.

use libreg_codegen::{GeneratorOptions, generate};
use libreg_parser::{FrontEnd, ScanSession, SourceFile};
use pretty_assertions::assert_eq;

const VEC3: &str = include_str!("fixtures/lib_vec3.c");
const VEC3_EXPECTED: &str = include_str!("fixtures/lib_vec3.expected.c");
const SHAPES: &str = include_str!("fixtures/lib_shapes.c");

fn scan(files: &[(&str, &str)]) -> ScanSession {
    let front = FrontEnd::default();
    let mut session = ScanSession::new("LJLIB_");
    for (path, text) in files {
        front.scan(&mut session, SourceFile::new(*path, *text));
    }
    session
}

fn render(session: &ScanSession) -> String {
    generate(session.collection(), &GeneratorOptions::default()).expect("generate")
}

#[test]
fn vec3_library_matches_golden_output() {
    let session = scan(&[("lib_vec3.c", VEC3)]);
    assert!(session.is_clean(), "{:?}", session.diagnostics());
    assert_eq!(render(&session), VEC3_EXPECTED);
}

#[test]
fn global_function_after_module_is_installed_globally() {
    let text = "\
LJLIB_MODULE(Vec3, userdata)
LJLIB_REC(.) int Vec3_length(lua_State *L) { return 1; }
LJLIB_REC(.) int print_banner(lua_State *L) { return 0; }
";
    let session = scan(&[("lib_vec3.c", text)]);
    assert!(session.is_clean(), "{:?}", session.diagnostics());
    let out = render(&session);

    assert!(out.contains("extern int lj_cf_Vec3_length(lua_State* L);"));
    assert!(out.contains("extern int lj_cf_print_banner(lua_State* L);"));
    assert!(out.contains("  slot = lj_tab_setstr(L, memberTable, lj_str_newz(L, \"length\"));\n"));
    assert!(out.contains(
        "  func = lj_func_newfastC(L, &RecorderInfo[1], 0);\n  slot = lj_tab_setstr(L, libTable, lj_str_newz(L, \"print_banner\"));\n"
    ));
    assert!(!out.contains("Register_print"));
    assert!(!out.contains("\"banner\""));
    assert!(out.ends_with("  Register_Vec3(L, mtList, membersList);\n}\n"));
}

#[test]
fn generation_is_deterministic() {
    let first = render(&scan(&[("lib_vec3.c", VEC3), ("lib_shapes.c", SHAPES)]));
    let second = render(&scan(&[("lib_vec3.c", VEC3), ("lib_shapes.c", SHAPES)]));
    assert_eq!(first, second);
}

#[test]
fn rescanning_a_file_gives_the_same_count_per_pass() {
    let single = scan(&[("lib_vec3.c", VEC3)]);
    let twice = scan(&[("lib_vec3.c", VEC3), ("lib_vec3.c", VEC3)]);

    let per_pass = single.collection().function_count();
    assert_eq!(per_pass, 2);
    assert_eq!(twice.collection().function_count(), per_pass * 2);

    let ids: Vec<u32> = twice
        .collection()
        .bound_entries()
        .filter_map(|(_, entry)| entry.function_id)
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn shapes_library_covers_every_keyword() {
    let session = scan(&[("lib_shapes.c", SHAPES)]);
    assert!(session.is_clean(), "{:?}", session.diagnostics());
    let out = render(&session);

    // NOEXTERN and templated recorders get no declaration; field accessors
    // use the runtime's generic recorders.
    assert!(!out.contains("LJ_FASTCALL recff_shape_dispatch("));
    assert!(!out.contains("LJ_FASTCALL recff_handle"));
    assert!(!out.contains("LJ_FASTCALL recff_GetObjectField("));
    assert!(out.contains("extern void LJ_FASTCALL recff_Rect___index(jit_State *J, struct RecordFFData *rd);"));

    assert!(out.contains(
        "  {&recff_shape_dispatch, ((SHAPE_F_FAST) << 16)|(SHAPE_AREA), \"Rect_area\", &lj_cf_Rect_area},\n"
    ));
    assert!(out.contains(
        "  {&recff_GetObjectField, Rect| (FieldTypeLookup<double>::fieldtype << 8)|(offsetof(Rect, h) << 16), \"Rect_geth\", &lj_cf_Rect_geth},\n"
    ));
    assert!(out.contains(
        "  {&recff_SetObjectField, Rect| (FieldTypeLookup<double>::fieldtype << 8)|(0 << 16), \"Rect_setw\", &lj_cf_Rect_setw},\n"
    ));
    assert!(out.contains("  {&recff_handle<Rect>, 0, \"Handle___gc\", &lj_cf_Handle___gc},\n"));

    assert!(out.contains(
        "void Register_Rect(lua_State* L, GCtab* mtList, GCtab* membersList, uint32_t flags){"
    ));
    assert!(out.contains(
        "  func = lj_func_newfastC(L, &RecorderInfo[0], 2);\n  setstrV(L, &func->c.upvalue[0], lj_str_newz(L, \"rect\"));\n  settabV(L, &func->c.upvalue[1], memberTable);\n  slot = lj_tab_setstr(L, memberTable, lj_str_newz(L, \"area\"));\n"
    ));
    assert!(out.contains(
        "  if (flags & (JIT_F_SSE4_1)) {\n    func = lj_func_newfastC(L, &RecorderInfo[3], 1);\n    copyTV(L, &func->c.upvalue[0], L->base+0);\n    slot = lj_tab_setstr(L, metaTable, lj_str_newz(L, \"__index\"));\n"
    ));

    assert!(out.contains("void Register_Handle(lua_State* L, GCtab* mtList, GCtab* membersList){"));
    assert!(out.contains("  slot = lj_tab_setstr(L, tabV(registry(L)), lj_str_newz(L, \"Handle\"));\n"));
    assert!(out.contains(
        "  copyTV(L, &func->c.upvalue[0], lj_tab_getstr(mtList, lj_str_newz(L, \"Rect\")));\n  copyTV(L, &func->c.upvalue[1], lj_tab_getstr(tabref(L->env), lj_str_newz(L, \"print\")));\n"
    ));

    assert!(out.ends_with(
        "  Register_Rect(L, mtList, membersList, flags);\n  Register_Handle(L, mtList, membersList);\n}\n"
    ));
}

#[test]
fn unannotated_library_renders_only_scaffolding() {
    let session = scan(&[("plain.c", "int helper(lua_State *L) { return 0; }\n")]);
    let out = render(&session);
    assert!(!out.contains("lj_cf_helper"));
    assert!(!out.contains("RecorderInfo[]"));
}

#[test]
fn invalid_entries_are_left_out_of_the_output() {
    let text = "\
LJLIB_MODULE(Vec3, userdata)
LJLIB_PUSH(nosuchalias) LJLIB_REC(.) int Vec3_bad(lua_State *L) { return 0; }
LJLIB_REC(.) int Vec3_good(lua_State *L) { return 0; }
";
    let session = scan(&[("lib_bad.c", text)]);
    assert!(!session.is_clean());

    let out = render(&session);
    assert!(out.contains("lj_cf_Vec3_good"));
    assert!(!out.contains("lj_cf_Vec3_bad"));
}

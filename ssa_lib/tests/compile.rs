use pretty_assertions::assert_eq;
use ssa_ir::{parse_func, parse_unit, Func};
use ssa_lib::{
    compile_func, compile_unit,
    outputter::{MipsOutputConfig, MipsOutputter},
    Config, ConfigBuilder, Ice, Program, Relocation,
};

fn config() -> Config {
    let _ = env_logger::builder().is_test(true).try_init();
    ConfigBuilder::new()
        .check_after_each_pass(true)
        .build()
        .unwrap()
}

fn compile(src: &str) -> Result<Program, Ice> {
    let config = config();
    let func = parse_func(src, config.registry()).unwrap();
    compile_func(&config, func)
}

fn assembly(program: &Program) -> String {
    let mut output = String::new();
    MipsOutputter::new(&mut output)
        .with_config(MipsOutputConfig {
            use_register_names: true,
        })
        .write_program(program)
        .unwrap();
    output
}

#[test]
fn compiles_straight_line_code() {
    let program = compile(
        "\
func add
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Add <Int32> v2 v3
    Ret v4
",
    )
    .unwrap();
    assert_eq!(0, program.frame_size);
    assert_eq!(
        "	.globl	add
add:
add.b1:
	lw	$t0, 0($sp)
	lw	$t1, 4($sp)
	addu	$t0, $t0, $t1
	move	$v0, $t0
	jr	$ra
",
        assembly(&program)
    );
}

#[test]
fn compiles_loops() {
    let program = compile(
        "\
func count
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Const <Int32> [0]
    Plain -> b2
b2: <- b1 b3
    v4 = Phi <Int32> v3 v6
    v5 = Less <Bool> v4 v2
    If v5 -> b3 b4
b3: <- b2
    v7 = Const <Int32> [1]
    v6 = Add <Int32> v4 v7
    Plain -> b2
b4: <- b2
    Ret v4
",
    )
    .unwrap();
    assert_eq!(
        "	.globl	count
count:
count.b1:
	lw	$t0, 0($sp)
	li	$t1, 0
count.b2:
	sgt	$t2, $t0, $t1
	beq	$t2, $zero, count.b4
count.b3:
	addiu	$t2, $t1, 1
	move	$t1, $t2
	j	count.b2
count.b4:
	move	$v0, $t1
	jr	$ra
",
        assembly(&program)
    );
}

#[test]
fn saves_registers_around_calls() {
    let program = compile(
        "\
func caller
b1:
    v1 = InitMem <Mem>
    v2 = Arg <UInt32> [0]
    v3 = StaticCall <(UInt32,Mem)> {ext} v1
    Call v3 -> b2
b2: <- b1
    v4 = Select0 <UInt32> v3
    v5 = Add <UInt32> v4 v2
    Ret v5
",
    )
    .unwrap();
    assert_eq!(8, program.frame_size);
    assert_eq!(
        vec![Relocation {
            instr: 4,
            sym: "ext".to_owned()
        }],
        program.relocations
    );
    assert_eq!(
        "	.globl	caller
caller:
	addiu	$sp, $sp, -8
	sw	$ra, 0($sp)
	sw	$s0, 4($sp)
caller.b1:
	lw	$s0, 8($sp)
	jal	ext
caller.b2:
	move	$t0, $v0
	addu	$t0, $t0, $s0
	move	$v0, $t0
	lw	$ra, 0($sp)
	lw	$s0, 4($sp)
	addiu	$sp, $sp, 8
	jr	$ra
",
        assembly(&program)
    );
}

#[test]
fn recomputes_constants_after_calls() {
    let program = compile(
        "\
func keep
b1:
    v1 = InitMem <Mem>
    v2 = Const <UInt32> [100000]
    v3 = StaticCall <(UInt32,Mem)> {ext} v1
    Call v3 -> b2
b2: <- b1
    v4 = Select0 <UInt32> v3
    v5 = Add <UInt32> v4 v2
    Ret v5
",
    )
    .unwrap();
    let asm = assembly(&program);
    let call = asm.find("\tjal\text\n").unwrap();
    let constant = asm.find("\tli\t$t1, 100000\n").unwrap();
    assert!(call < constant, "{asm}");
    assert!(!asm.contains("$s0"), "{asm}");
}

#[test]
fn elides_nil_checks_before_faulting_loads() {
    let covered = compile(
        "\
func covered
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = OffPtr <Ptr> [4] v2
    v4 = NilCheck <Void> v2 v1
    v5 = Load <Int32> v3 v1
    Ret v5
",
    )
    .unwrap();
    assert_eq!(
        vec!["lw", "lw", "move", "jr"],
        covered.mnemonics().collect::<Vec<_>>()
    );

    let uncovered = compile(
        "\
func uncovered
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = Arg <Ptr> [4]
    v4 = NilCheck <Void> v2 v1
    v5 = Load <Int32> v3 v1
    Ret v5
",
    )
    .unwrap();
    assert!(assembly(&uncovered).contains("\tlb\t$zero, 0($t0)\n"));
}

#[test]
fn loads_the_memory_a_store_overwrites_first() {
    let program = compile(
        "\
func reload
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = Arg <Int32> [4]
    v4 = Store <Mem> v2 v3 v1
    v5 = Load <Int32> v2 v1
    Ret v5
",
    )
    .unwrap();
    assert_eq!(
        vec!["lw", "lw", "lw", "sw", "move", "jr"],
        program.mnemonics().collect::<Vec<_>>()
    );
}

#[test]
fn masks_shifts_by_a_register_amount() {
    let program = compile(
        "\
func shl
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <UInt32> [4]
    v4 = Lsh <Int32> v2 v3
    Ret v4
",
    )
    .unwrap();
    let mnemonics: Vec<_> = program.mnemonics().collect();
    for mnemonic in ["sllv", "sltiu", "subu", "and"] {
        assert!(mnemonics.contains(&mnemonic), "{mnemonic} missing from {mnemonics:?}");
    }
}

#[test]
fn folds_shifts_by_32_or_more() {
    let program = compile(
        "\
func sar
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Const <Int32> [40]
    v4 = Rsh <Int32> v2 v3
    Ret v4
",
    )
    .unwrap();
    assert!(assembly(&program).contains("\tsra\t$t0, $t0, 31\n"));

    let program = compile(
        "\
func shr
b1:
    v1 = InitMem <Mem>
    v2 = Arg <UInt32> [0]
    v3 = Const <UInt32> [32]
    v4 = RshU <UInt32> v2 v3
    Ret v4
",
    )
    .unwrap();
    let asm = assembly(&program);
    assert!(!asm.contains("srl"), "{asm}");
    assert!(program.mnemonics().any(|m| m == "li"), "{asm}");
}

#[test]
fn recomputes_compares_for_branches_in_other_blocks() {
    let program = compile(
        "\
func twice
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Float32> [0]
    v3 = Arg <Float32> [4]
    v4 = Arg <Float32> [8]
    v5 = LessF <Bool> v2 v3
    v6 = LessF <Bool> v3 v4
    If v6 -> b2 b3
b2: <- b1
    If v5 -> b4 b5
b3: <- b1
    v7 = Const <Int32> [0]
    Ret v7
b4: <- b2
    v8 = Const <Int32> [1]
    Ret v8
b5: <- b2
    v9 = Const <Int32> [2]
    Ret v9
",
    )
    .unwrap();
    let flag_lines: Vec<_> = assembly(&program)
        .lines()
        .map(|line| line.trim().replace('\t', " "))
        .filter(|line| line.starts_with("c.") || line.starts_with("bc1"))
        .collect();
    assert_eq!(
        vec![
            "c.lt.s $f2, $f4",
            "bc1f twice.b3",
            "c.lt.s $f0, $f2",
            "bc1f twice.b5",
        ],
        flag_lines
    );
}

const UNIT: &str = "\
func first
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Const <Int32> [8]
    v4 = Mul <Int32> v2 v3
    Ret v4

func second
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Sub <Int32> v2 v3
    Ret v4

func third
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Bool> [0]
    If v2 -> b2 b3
b2: <- b1
    v3 = Const <Int32> [1]
    Ret v3
b3: <- b1
    v4 = Const <Int32> [2]
    Ret v4
";

fn unit(config: &Config) -> Vec<Func> {
    parse_unit(UNIT, config.registry()).unwrap()
}

#[test]
fn output_doesnt_depend_on_the_number_of_threads() {
    let config = config();
    let compile_with = |threads| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| compile_unit(&config, unit(&config)))
            .unwrap()
    };
    let sequential = compile_with(1);
    let names: Vec<_> = sequential.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(vec!["first", "second", "third"], names);
    for _ in 0..4 {
        assert_eq!(sequential, compile_with(4));
    }
}

#[test]
fn reports_the_first_failing_function() {
    let config = config();
    let mut funcs = unit(&config);
    let wide = "\
func wide
b1:
    v2 = Arg <Int64> [0]
    v3 = Add <Int64> v2 v2
    Ret v3
";
    funcs.insert(1, parse_func(wide, config.registry()).unwrap());
    funcs.push(
        parse_func(&wide.replace("func wide", "func wider"), config.registry()).unwrap(),
    );

    let err = compile_unit(&config, funcs).unwrap_err();
    assert_eq!("wide", err.func);
    assert_eq!("unlowered", err.ice.kind());
}

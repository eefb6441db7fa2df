use multitable::MultiTable;

#[derive(Debug, Clone, MultiTable)]
#[multitable(module = port)]
#[multitable(index(fields(node, direction, offset), getter = find, unique))]
#[multitable(index(fields(node, direction), getter = get_by_node))]
#[multitable(index(fields(edge), getter = get_by_edge))]
pub struct Port {
    node: u32,
    direction: Direction,
    offset: u16,
    edge: u32,
}

#[derive(Debug, Clone, MultiTable)]
#[multitable(module = node)]
#[multitable(index(fields(parent), getter = get_children))]
pub struct Node {
    parent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Input = 0,
    Output = 1,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    ports: port::Table,
    nodes: node::Table,
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let mut graph = Graph::default();
    let root = graph.nodes.insert(Node { parent: u32::MAX })? as u32;
    for _ in 0..3 {
        graph.nodes.insert(Node { parent: root })?;
    }

    let ports = &mut graph.ports;
    ports.insert(Port {
        node: 0,
        direction: Direction::Input,
        offset: 0,
        edge: 0,
    })?;
    let b = ports.insert(Port {
        node: 0,
        direction: Direction::Output,
        offset: 1,
        edge: 1,
    })?;
    ports.insert(Port {
        node: 0,
        direction: Direction::Input,
        offset: 2,
        edge: 1,
    })?;

    let duplicate = ports.insert(Port {
        node: 0,
        direction: Direction::Input,
        offset: 2,
        edge: 7,
    });
    println!("duplicate port: {:?}", duplicate.err());

    println!("{:#?}", ports);
    println!(
        "inputs of node 0: {:?}",
        ports.get_by_node(&0, &Direction::Input).collect::<Vec<_>>()
    );

    let removed = ports.remove(b);
    println!("removed: {:?}", removed);
    println!("ports on edge 1: {:?}", ports.get_by_edge(&1).collect::<Vec<_>>());
    println!(
        "input at offset 2: {:?}",
        ports.find(&0, &Direction::Input, &2)
    );
    println!(
        "children of root: {:?}",
        graph.nodes.get_children(&root).collect::<Vec<_>>()
    );

    graph.ports.check()?;
    graph.nodes.check()?;
    Ok(())
}
